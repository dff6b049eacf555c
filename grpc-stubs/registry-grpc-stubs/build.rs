fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../../proto/registry/v1/registry.proto");
    println!("cargo:rerun-if-changed=../../proto");

    let descriptor_path =
        std::path::PathBuf::from(std::env::var("OUT_DIR")?).join("registry_descriptor.bin");

    tonic_prost_build::configure()
        .build_client(true)
        .build_server(true)
        .file_descriptor_set_path(&descriptor_path)
        .compile_protos(&["../../proto/registry/v1/registry.proto"], &["../../proto"])?;

    Ok(())
}
