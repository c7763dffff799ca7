//! Demonstration command set for the Argon engine.
//!
//! These commands exercise the engine's surface end to end: positional and
//! named binding, aliases, defaults, validation, collection parameters,
//! rest collectors, injected services, filters, and cooperative
//! cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use argon_core::{
    ArgValue, ArgonError, BoundArgs, CommandFilter, CommandHandler, CommandSpec, CommandTable,
    FilterNode, InvocationContext, ParamSpec, Result, TypeTag, ValidationRule,
};

/// Greeting prefix injected into the `greet` command.
pub struct Stamp {
    pub prefix: String,
}

/// Global filter logging how long each command took.
pub struct TimingFilter;

#[async_trait]
impl CommandFilter for TimingFilter {
    async fn handle(&self, ctx: &InvocationContext, next: &FilterNode) -> Result<i32> {
        let started = Instant::now();
        let result = next.invoke(ctx).await;
        debug!(command = %ctx.command_name(), elapsed = ?started.elapsed(), "command finished");
        result
    }
}

struct EchoHandler;

#[async_trait]
impl CommandHandler for EchoHandler {
    async fn invoke(&self, _ctx: &InvocationContext, args: &BoundArgs) -> Result<i32> {
        let message = args.get("message").and_then(|v| v.as_str()).unwrap_or_default();
        let repeat = args.get("repeat").and_then(|v| v.as_i64()).unwrap_or(1);
        let loud = args.get("loud").and_then(|v| v.as_bool()).unwrap_or(false);

        let line = if loud {
            message.to_uppercase()
        } else {
            message.to_string()
        };
        for _ in 0..repeat {
            println!("{}", line);
        }
        Ok(0)
    }
}

struct GreetHandler;

#[async_trait]
impl CommandHandler for GreetHandler {
    async fn invoke(&self, _ctx: &InvocationContext, args: &BoundArgs) -> Result<i32> {
        let name = args.get("name").and_then(|v| v.as_str()).unwrap_or_default();
        let stamp = args
            .get("stamp")
            .and_then(|v| v.service::<Stamp>())
            .ok_or_else(|| anyhow!("stamp service missing"))?;

        println!("{} {}", stamp.prefix, name);
        Ok(0)
    }
}

struct SumHandler;

#[async_trait]
impl CommandHandler for SumHandler {
    async fn invoke(&self, _ctx: &InvocationContext, args: &BoundArgs) -> Result<i32> {
        let values = args.get("values").and_then(|v| v.as_array()).unwrap_or(&[]);
        let sum: i64 = values.iter().filter_map(|v| v.as_i64()).sum();

        if args.get("json").and_then(|v| v.as_bool()).unwrap_or(false) {
            let values: Vec<i64> = values.iter().filter_map(|v| v.as_i64()).collect();
            println!("{}", json!({ "values": values, "sum": sum }));
        } else {
            println!("{}", sum);
        }
        Ok(0)
    }
}

struct AvgHandler;

#[async_trait]
impl CommandHandler for AvgHandler {
    async fn invoke(&self, _ctx: &InvocationContext, args: &BoundArgs) -> Result<i32> {
        let values = args.get("values").and_then(|v| v.as_array()).unwrap_or(&[]);
        if values.is_empty() {
            return Err(anyhow!("no values to average").into());
        }

        let sum: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
        println!("{}", sum / values.len() as f64);
        Ok(0)
    }
}

struct WaitHandler;

#[async_trait]
impl CommandHandler for WaitHandler {
    async fn invoke(&self, ctx: &InvocationContext, args: &BoundArgs) -> Result<i32> {
        let seconds = args.get("seconds").and_then(|v| v.as_f64()).unwrap_or(5.0);

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs_f64(seconds)) => {
                println!("done");
                Ok(0)
            }
            _ = ctx.cancellation.cancelled() => {
                Err(ArgonError::Cancelled { forced: false })
            }
        }
    }
}

/// Build the demo command table.
pub fn command_table() -> anyhow::Result<CommandTable> {
    let table = CommandTable::new()
        .register(
            CommandSpec::new(&["echo"], "Echo a message", Arc::new(EchoHandler))
                .with_param(ParamSpec::new("message", TypeTag::String))
                .with_param(
                    ParamSpec::new("repeat", TypeTag::Integer)
                        .with_short('r')
                        .with_default(ArgValue::Integer(1))
                        .with_rule(ValidationRule::range(1.0, 100.0)),
                )
                .with_param(ParamSpec::new("loud", TypeTag::Boolean).with_short('l')),
        )?
        .register(
            CommandSpec::new(&["greet"], "Greet someone by name", Arc::new(GreetHandler))
                .with_param(ParamSpec::new("name", TypeTag::String))
                .with_param(ParamSpec::service::<Stamp>("stamp")),
        )?
        .register(
            CommandSpec::new(&["calc", "sum"], "Sum integers", Arc::new(SumHandler))
                .with_param(ParamSpec::rest("values", TypeTag::Integer))
                .with_param(ParamSpec::new("json", TypeTag::Boolean)),
        )?
        .register(
            CommandSpec::new(&["calc", "avg"], "Average a list of numbers", Arc::new(AvgHandler))
                .with_param(ParamSpec::new("values", TypeTag::Array(Box::new(TypeTag::Float)))),
        )?
        .register(
            CommandSpec::new(&["wait"], "Sleep until done or cancelled", Arc::new(WaitHandler))
                .with_param(
                    ParamSpec::new("seconds", TypeTag::Float)
                        .with_short('s')
                        .with_default(ArgValue::Float(5.0)),
                ),
        )?;

    Ok(table)
}
