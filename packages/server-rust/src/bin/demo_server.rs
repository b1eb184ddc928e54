//! Demo server exposing two sample operations over HTTP.
//!
//! ```text
//! curl -X POST localhost:8080/Add -d '{"a":1,"b":2}'
//! curl -X POST localhost:8080/GetItem -d '{"id":7}'
//! ```

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use opgate_core::{
    AllowedErrors, IdentifiableError, OperationFailure, RequestContext, Validatable,
    ValidationError,
};
use opgate_server::network::{NetworkConfig, NetworkModule};
use opgate_server::{JsonDelegate, OperationHandler, OperationPipeline, OperationRouter, ServerConfig};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "opgate-demo", version, about = "opgate demo operation server")]
struct Args {
    /// Bind host.
    #[arg(long, env = "OPGATE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Bind port. 0 picks a free port.
    #[arg(long, env = "OPGATE_PORT", default_value_t = 8080)]
    port: u16,

    /// Node identifier copied into every request context.
    #[arg(long, env = "OPGATE_NODE_ID", default_value = "demo-node")]
    node_id: String,

    /// Per-operation timeout in milliseconds.
    #[arg(long, env = "OPGATE_OPERATION_TIMEOUT_MS", default_value_t = 30_000)]
    operation_timeout_ms: u64,

    /// Maximum operation handlers running at once; further calls get 503.
    #[arg(long, env = "OPGATE_MAX_CONCURRENT", default_value_t = 1000)]
    max_concurrent: u32,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

// ---------------------------------------------------------------------------
// Sample operations
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
enum CatalogError {
    #[error("NotFound")]
    NotFound,
    #[error("Discontinued")]
    Discontinued,
}

impl IdentifiableError for CatalogError {}

#[derive(Debug, Serialize, Deserialize)]
struct AddInput {
    a: i64,
    b: i64,
}

const OPERAND_RANGE: std::ops::RangeInclusive<i64> = -1_000_000..=1_000_000;

impl Validatable for AddInput {
    fn validate(&self) -> Result<(), ValidationError> {
        if !OPERAND_RANGE.contains(&self.a) || !OPERAND_RANGE.contains(&self.b) {
            return Err(ValidationError::new("operands must be within +/-1000000"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GetItemInput {
    id: u32,
}

impl Validatable for GetItemInput {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.id == 0 {
            return Err(ValidationError::new("id must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Item {
    id: u32,
    name: String,
}

impl Validatable for Item {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::new("item name must not be empty"));
        }
        Ok(())
    }
}

fn add(input: AddInput, _ctx: &RequestContext) -> Result<i64, OperationFailure<CatalogError>> {
    Ok(input.a + input.b)
}

fn get_item(input: GetItemInput, ctx: &RequestContext) -> Result<Item, OperationFailure<CatalogError>> {
    info!(trace_id = %ctx.trace_id, id = input.id, "looking up item");
    match input.id {
        1..=9 => Ok(Item {
            id: input.id,
            name: format!("item-{}", input.id),
        }),
        13 => Err(OperationFailure::returnable(CatalogError::Discontinued)),
        500 => Err(anyhow::anyhow!("catalog backend unavailable").into()),
        _ => Err(OperationFailure::returnable(CatalogError::NotFound)),
    }
}

fn build_router(config: &ServerConfig) -> OperationRouter {
    let mut router = OperationRouter::new(config);

    let add_handler: OperationHandler<AddInput, i64, CatalogError, RequestContext, JsonDelegate> =
        OperationHandler::new(add, AllowedErrors::new());
    // Discontinued is deliberately not whitelisted: callers see a generic 500.
    let get_item_handler: OperationHandler<
        GetItemInput,
        Item,
        CatalogError,
        RequestContext,
        JsonDelegate,
    > = OperationHandler::new(
        get_item,
        AllowedErrors::from_errors([(CatalogError::NotFound, 404)]),
    );

    router.register("Add", add_handler);
    router.register("GetItem", get_item_handler);
    router
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("opgate_server=info,tower_http=info"));
    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let server_config = ServerConfig {
        node_id: args.node_id,
        default_operation_timeout_ms: args.operation_timeout_ms,
        max_concurrent_operations: args.max_concurrent,
        ..ServerConfig::default()
    };
    let network_config = NetworkConfig {
        host: args.host,
        port: args.port,
        request_timeout: Duration::from_millis(args.operation_timeout_ms.saturating_add(1_000)),
    };

    let pipeline = OperationPipeline::new(build_router(&server_config), &server_config);
    let mut module = NetworkModule::new(network_config, pipeline);
    let port = module.start().await?;
    info!(port, node_id = %server_config.node_id, "opgate demo server started");

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_extreme_operands() {
        for (a, b) in [(i64::MIN, 0), (0, i64::MAX), (1_000_001, 1)] {
            let err = AddInput { a, b }.validate().unwrap_err();
            assert_eq!(err.reason, "operands must be within +/-1000000");
        }
        assert!(AddInput {
            a: -1_000_000,
            b: 1_000_000
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn registers_sample_operations() {
        let router = build_router(&ServerConfig::default());
        assert_eq!(router.operation_names(), vec!["Add", "GetItem"]);
    }
}
