//! Build script for pcbook-proto
//!
//! Compiles protobuf definitions using tonic-prost-build.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = "../../proto";

    let protos = [
        "pcbook/v1/laptop.proto",
        "pcbook/v1/laptop_service.proto",
        "pcbook/v1/auth_service.proto",
    ];

    let proto_paths: Vec<String> = protos
        .iter()
        .map(|p| format!("{proto_root}/{p}"))
        .collect();
    let includes = [proto_root.to_string()];

    for path in &proto_paths {
        println!("cargo:rerun-if-changed={path}");
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&proto_paths, &includes)?;

    Ok(())
}
