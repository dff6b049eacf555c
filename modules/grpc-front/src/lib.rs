//! tonic gRPC front-end: one RPC per controller operation, with
//! reflection enabled and the status-code mapping from the error
//! taxonomy.

use std::net::SocketAddr;
use std::sync::Arc;

use registry_ctrl::Controller;
use registry_grpc_stubs::registry::v1::{
    registry_service_server::{RegistryService, RegistryServiceServer},
    Empty, ListAddrs, ListNames, NameAndAddress, ServiceAddress, ServiceName,
};
use tokio_util::sync::CancellationToken;
use tonic::{transport::Server, Request, Response, Status};

fn status_for(e: &registry_ctrl::Error) -> Status {
    match e {
        registry_ctrl::Error::NotFound => Status::not_found(e.to_string()),
        registry_ctrl::Error::AlreadyExists => Status::already_exists(e.to_string()),
        registry_ctrl::Error::DecodeRequest => Status::invalid_argument(e.to_string()),
        registry_ctrl::Error::Internal => Status::internal(e.to_string()),
    }
}

pub struct RegistryGrpc {
    ctrl: Arc<Controller>,
}

impl RegistryGrpc {
    pub fn new(ctrl: Arc<Controller>) -> Self {
        Self { ctrl }
    }
}

#[tonic::async_trait]
impl RegistryService for RegistryGrpc {
    async fn register(
        &self,
        request: Request<NameAndAddress>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        if req.name.is_empty() || req.address.is_empty() {
            return Err(Status::invalid_argument(
                registry_ctrl::Error::DecodeRequest.to_string(),
            ));
        }

        self.ctrl
            .register(&req.name, &req.address)
            .await
            .map_err(|e| status_for(&e))?;

        Ok(Response::new(Empty {}))
    }

    async fn deregister(
        &self,
        request: Request<NameAndAddress>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        if req.name.is_empty() || req.address.is_empty() {
            return Err(Status::invalid_argument(
                registry_ctrl::Error::DecodeRequest.to_string(),
            ));
        }

        self.ctrl
            .deregister(&req.name, &req.address)
            .await
            .map_err(|e| status_for(&e))?;

        Ok(Response::new(Empty {}))
    }

    async fn find_service(
        &self,
        request: Request<ServiceName>,
    ) -> Result<Response<ServiceAddress>, Status> {
        let req = request.into_inner();
        if req.name.is_empty() {
            return Err(Status::invalid_argument(
                registry_ctrl::Error::DecodeRequest.to_string(),
            ));
        }

        let address = self
            .ctrl
            .find_service_by_name(&req.name)
            .await
            .map_err(|e| status_for(&e))?;

        Ok(Response::new(ServiceAddress { address }))
    }

    async fn list_services(&self, _request: Request<Empty>) -> Result<Response<ListNames>, Status> {
        let name = self
            .ctrl
            .list_services()
            .await
            .map_err(|e| status_for(&e))?;

        Ok(Response::new(ListNames { name }))
    }

    async fn list_addrs(
        &self,
        request: Request<ServiceName>,
    ) -> Result<Response<ListAddrs>, Status> {
        let req = request.into_inner();
        if req.name.is_empty() {
            return Err(Status::invalid_argument(
                registry_ctrl::Error::DecodeRequest.to_string(),
            ));
        }

        let address = self
            .ctrl
            .list_addrs(&req.name)
            .await
            .map_err(|e| status_for(&e))?;

        Ok(Response::new(ListAddrs { address }))
    }
}

/// Serve the gRPC front-end on `port` until `cancel` fires.
pub async fn serve(ctrl: Arc<Controller>, port: u16, cancel: CancellationToken) -> anyhow::Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(registry_grpc_stubs::FILE_DESCRIPTOR_SET)
        .build_v1()?;

    tracing::info!(%addr, "grpc front-end listening");

    Server::builder()
        .add_service(RegistryServiceServer::new(RegistryGrpc::new(ctrl)))
        .add_service(reflection)
        .serve_with_shutdown(addr, async move { cancel.cancelled().await })
        .await?;

    Ok(())
}
