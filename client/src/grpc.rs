// Copyright 2018-2021 Cargill Incorporated
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Client stub for the `gateway.Gateway` gRPC service.
//!
//! Mirrors `gateway/gateway.proto` from `hyperledger/fabric-protos` v0.3.x; only the unary
//! `Evaluate` method is used.

use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{GrpcMethod, IntoRequest, Response, Status};

use crate::protos::{EvaluateRequest, EvaluateResponse};

const SERVICE_NAME: &str = "gateway.Gateway";
const EVALUATE_PATH: &str = "/gateway.Gateway/Evaluate";

#[derive(Debug, Clone)]
pub struct GatewayServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl GatewayServiceClient {
    pub fn new(channel: Channel) -> Self {
        GatewayServiceClient {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    /// Evaluates a signed proposal on a peer without committing it to the ledger.
    pub async fn evaluate(
        &mut self,
        request: impl IntoRequest<EvaluateRequest>,
    ) -> Result<Response<EvaluateResponse>, Status> {
        self.inner
            .ready()
            .await
            .map_err(|err| Status::unknown(format!("Service was not ready: {}", err)))?;

        let mut request = request.into_request();
        request
            .extensions_mut()
            .insert(GrpcMethod::new(SERVICE_NAME, "Evaluate"));

        let codec: ProstCodec<EvaluateRequest, EvaluateResponse> = ProstCodec::default();
        self.inner
            .unary(request, PathAndQuery::from_static(EVALUATE_PATH), codec)
            .await
    }
}
