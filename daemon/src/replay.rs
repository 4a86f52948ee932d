//! JSON-lines operation scripts.
//!
//! Each non-empty line is one operation. Operations between two
//! `{"op":"barrier"}` lines form a wave and run concurrently; waves run in
//! file order. Lines starting with `#` are comments.
//!
//! ```text
//! {"op":"submit","submitter":"u0","category":"congestion","longitude":116.4,"latitude":39.9,"report_id":"r1"}
//! {"op":"barrier"}
//! {"op":"corroborate","report_id":"r1","voter":"u1"}
//! {"op":"corroborate","report_id":"r1","voter":"u2"}
//! ```

use std::sync::Arc;

use anyhow::Context;
use roadwatch_engine::{EngineError, NewReport, VerificationEngine};
use roadwatch_types::{Category, Coordinates, Location, PrincipalId, ReportId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayOp {
    Submit {
        submitter: PrincipalId,
        category: Category,
        #[serde(default)]
        description: String,
        longitude: f64,
        latitude: f64,
        #[serde(default)]
        name: String,
        #[serde(default)]
        address: String,
        #[serde(default)]
        report_id: Option<ReportId>,
    },
    Corroborate {
        report_id: ReportId,
        voter: PrincipalId,
        #[serde(default = "default_affirmative")]
        affirmative: bool,
    },
    Override {
        report_id: ReportId,
        admin: PrincipalId,
    },
    Reject {
        report_id: ReportId,
        admin: PrincipalId,
    },
    Transfer {
        from: PrincipalId,
        to: PrincipalId,
        amount: u64,
    },
    Barrier,
}

fn default_affirmative() -> bool {
    true
}

/// Outcome of one scripted operation.
#[derive(Debug, Serialize)]
pub struct ReplayResult {
    pub line: usize,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Parse a script into waves of `(line number, op)`.
pub fn parse_script(script: &str) -> anyhow::Result<Vec<Vec<(usize, ReplayOp)>>> {
    let mut waves = vec![Vec::new()];
    for (idx, raw) in script.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let op: ReplayOp =
            serde_json::from_str(line).with_context(|| format!("line {}", idx + 1))?;
        match op {
            ReplayOp::Barrier => waves.push(Vec::new()),
            op => {
                if let Some(wave) = waves.last_mut() {
                    wave.push((idx + 1, op));
                }
            }
        }
    }
    waves.retain(|w| !w.is_empty());
    Ok(waves)
}

pub fn error_json(e: &EngineError) -> Value {
    json!({
        "code": e.reason_code(),
        "status": e.status_code(),
        "retryable": e.is_retryable(),
        "message": e.to_string(),
    })
}

async fn execute(engine: &VerificationEngine, op: ReplayOp) -> Result<Value, EngineError> {
    let value = match op {
        ReplayOp::Submit {
            submitter,
            category,
            description,
            longitude,
            latitude,
            name,
            address,
            report_id,
        } => {
            let location = Location {
                name,
                address,
                coordinates: Coordinates::new(longitude, latitude)?,
            };
            let mut new = NewReport::new(submitter, category, location).with_description(description);
            new.report_id = report_id;
            json!(engine.submit(new).await?)
        }
        ReplayOp::Corroborate {
            report_id,
            voter,
            affirmative,
        } => json!(engine.corroborate(&report_id, &voter, affirmative).await?),
        ReplayOp::Override { report_id, admin } => {
            let is_admin = engine.is_admin(&admin).await?;
            json!(engine.admin_override(&report_id, &admin, is_admin).await?)
        }
        ReplayOp::Reject { report_id, admin } => {
            let is_admin = engine.is_admin(&admin).await?;
            json!(engine.admin_reject(&report_id, &admin, is_admin).await?)
        }
        ReplayOp::Transfer { from, to, amount } => {
            json!(engine.transfer(&from, &to, amount).await?)
        }
        ReplayOp::Barrier => Value::Null,
    };
    Ok(value)
}

/// Run every wave, each wave's operations concurrently. Results come back
/// in script order.
pub async fn run(
    engine: Arc<VerificationEngine>,
    waves: Vec<Vec<(usize, ReplayOp)>>,
) -> anyhow::Result<Vec<ReplayResult>> {
    let mut results = Vec::new();
    for wave in waves {
        let mut handles = Vec::with_capacity(wave.len());
        for (line, op) in wave {
            let engine = Arc::clone(&engine);
            handles.push((line, tokio::spawn(async move { execute(&engine, op).await })));
        }
        for (line, handle) in handles {
            let outcome = handle.await.context("replay task panicked")?;
            results.push(match outcome {
                Ok(value) => ReplayResult {
                    line,
                    ok: true,
                    value: Some(value),
                    error: None,
                },
                Err(e) => {
                    tracing::debug!(line, error = %e, "scripted operation failed");
                    ReplayResult {
                        line,
                        ok: false,
                        value: None,
                        error: Some(error_json(&e)),
                    }
                }
            });
        }
    }
    Ok(results)
}
