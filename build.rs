use std::env;

fn main() {
    // The library builds and tests on the host; only the firmware binary
    // needs the cortex-m-rt and defmt linker scripts.
    if env::var("CARGO_FEATURE_FIRMWARE").is_ok() {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
