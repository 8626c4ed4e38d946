//! Human-readable rendering of generation results.
//!
//! Pure formatting: the router never consults this module. Optional
//! telemetry fields (source, confidences) appear only when present; time
//! and function calls always do.

use crate::generator::GenerationResult;

/// Render a result under a banner label.
pub fn render(label: &str, result: &GenerationResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n=== {label} ===\n\n"));

    if let Some(ref source) = result.source {
        out.push_str(&format!("Source: {source}\n"));
    }
    if let Some(confidence) = result.confidence {
        out.push_str(&format!("Confidence: {confidence:.4}\n"));
    }
    if let Some(local_confidence) = result.local_confidence {
        out.push_str(&format!(
            "Local confidence (below threshold): {local_confidence:.4}\n"
        ));
    }

    out.push_str(&format!("Total time: {:.2}ms\n", result.total_time_ms));

    for call in &result.function_calls {
        out.push_str(&format!("Function: {}\n", call.name));
        let args = serde_json::to_string_pretty(&call.arguments)
            .unwrap_or_else(|_| "{}".to_string());
        out.push_str(&format!("Arguments: {args}\n"));
    }

    out
}

/// Render and write to stdout.
pub fn print(label: &str, result: &GenerationResult) {
    print!("{}", render(label, result));
}

// ── Tests ────────────────────────────────────────────────────────
