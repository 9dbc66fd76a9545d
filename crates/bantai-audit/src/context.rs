//! `with_audit`: registers sinks under the `"audit"` tool and adds the
//! optional `trace` field to the input schema (§4.8).

use crate::emitter::SinkFanoutEmitter;
use crate::sink::Sink;
use bantai_core::{AuditTool, Context, FieldKind, Result, Schema};
use serde_json::Value;
use std::sync::Arc;

/// Extend `context` so evaluations emit lifecycle audit events to `sinks`,
/// in registration order, and accept a `trace: {traceId?, requestId?}`
/// correlation field on their input (§4.8).
pub fn with_audit(context: &Context, sinks: Vec<Arc<dyn Sink>>) -> Result<Context> {
    let trace_schema = Schema::record([
        ("traceId", FieldKind::String.optional()),
        ("requestId", FieldKind::String.optional()),
    ]);
    let schema = Schema::record([("trace", FieldKind::Record(trace_schema).optional())]);
    let emitter: Arc<dyn bantai_core::AuditEmitter> = Arc::new(SinkFanoutEmitter::new(sinks));
    let tools = bantai_core::ToolBag::new().with_tool("audit", AuditTool(emitter));
    context.extend(schema, Value::Object(Default::default()), tools)
}
