// build.rs

use std::env;

fn main() {
    let version = env::var("FLEETMODELD_VERSION")
        .unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "dev".to_string()));

    println!("cargo:rustc-env=CARGO_PKG_VERSION={version}");
    println!("cargo:rerun-if-env-changed=FLEETMODELD_VERSION");

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(
            &["proto/model_service.proto"],
            &["proto"],
        )
        .expect("failed to compile serving engine proto definitions");
}
