use chrono::Utc;

fn main() {
    // Stamped into `--version` output by the driver binary.
    let build_date = Utc::now().format("%Y-%m-%d").to_string();
    println!("cargo:rustc-env=BUILD_DATE={build_date}");

    println!("cargo:rerun-if-changed=build.rs");
}
