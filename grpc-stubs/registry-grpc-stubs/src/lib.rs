pub mod registry {
    pub mod v1 {
        tonic::include_proto!("registry.v1");
    }
}

/// Compiled file descriptor set, used to register gRPC server reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("registry_descriptor");

