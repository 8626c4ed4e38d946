//! Hybrid routing engine.
//!
//! Inspects the on-device generator's structured output and decides whether
//! to accept it or escalate to the cloud generator. The policy is an
//! ordered chain of rejection rules evaluated first-match-wins: structural
//! checks (emptiness, cardinality, schema validity) run before the keyword
//! heuristic and the confidence threshold, so obviously-invalid output is
//! caught without trusting a possibly-uncalibrated confidence score.
//!
//! Escalation charges the caller for both attempts: the merged record
//! reports cloud time plus local time, carries the rejected local
//! confidence, and names the triggering rule in its `source` label.

use crate::generator::{joined_user_text, GenerationResult, Generator, Message};
use crate::tools::{FunctionCall, ToolIndex, ToolSpec};

/// Local confidence below this value escalates to cloud.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Source label for an accepted on-device result.
const SOURCE_ON_DEVICE: &str = "on-device";

/// Keywords signaling multi-step or comparative reasoning in user text.
///
/// Matched as plain substrings against the lower-cased, space-joined user
/// contents. The space-padded entries match only between other characters;
/// the bare entries match inside words too ("authenticate" contains
/// "then"). The list and its matching semantics are part of the routing
/// contract and are pinned by tests.
const COMPLEX_KEYWORDS: &[&str] = &[
    " and ",
    " or ",
    " if ",
    "compare",
    "difference",
    "between",
    "calculate",
    "then",
    "after",
];

// ── Fallback reasons ─────────────────────────────────────────────

/// Why a local result was rejected in favor of the cloud path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Local produced zero function calls.
    NoCalls,
    /// Local produced more than one call; only single-call acceptance is
    /// supported.
    MultiCall,
    /// The call names a tool that was never declared.
    InvalidTool,
    /// The call omits required parameters of its tool.
    MissingArgs,
    /// The user text matches the complexity keyword heuristic.
    ComplexQuery,
    /// Local confidence is below the threshold.
    LowConf,
}

impl FallbackReason {
    /// Stable label used in the merged record's `source` field.
    pub fn label(self) -> &'static str {
        match self {
            Self::NoCalls => "no_calls",
            Self::MultiCall => "multi_call",
            Self::InvalidTool => "invalid_tool",
            Self::MissingArgs => "missing_args",
            Self::ComplexQuery => "complex_query",
            Self::LowConf => "low_conf",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Rule chain ───────────────────────────────────────────────────

/// Everything a rejection rule may inspect.
struct RuleContext<'a> {
    local: &'a GenerationResult,
    index: &'a ToolIndex,
    /// Lower-cased, space-joined user-role contents.
    user_text: &'a str,
    threshold: f64,
}

impl RuleContext<'_> {
    fn first_call(&self) -> Option<&FunctionCall> {
        self.local.function_calls.first()
    }
}

/// One rejection rule: a predicate plus the reason it reports.
struct FallbackRule {
    reason: FallbackReason,
    applies: fn(&RuleContext<'_>) -> bool,
}

fn no_calls(ctx: &RuleContext<'_>) -> bool {
    ctx.local.function_calls.is_empty()
}

fn multi_call(ctx: &RuleContext<'_>) -> bool {
    ctx.local.function_calls.len() > 1
}

fn invalid_tool(ctx: &RuleContext<'_>) -> bool {
    ctx.first_call()
        .is_some_and(|call| !ctx.index.is_declared(&call.name))
}

fn missing_args(ctx: &RuleContext<'_>) -> bool {
    ctx.first_call()
        .is_some_and(|call| !ctx.index.has_required_args(call))
}

fn complex_query(ctx: &RuleContext<'_>) -> bool {
    COMPLEX_KEYWORDS.iter().any(|k| ctx.user_text.contains(k))
}

fn low_conf(ctx: &RuleContext<'_>) -> bool {
    ctx.local.confidence.unwrap_or(0.0) < ctx.threshold
}

/// The policy, in evaluation order. Cheap structural checks come first;
/// the semantic heuristic and the threshold close the chain.
const RULES: &[FallbackRule] = &[
    FallbackRule {
        reason: FallbackReason::NoCalls,
        applies: no_calls,
    },
    FallbackRule {
        reason: FallbackReason::MultiCall,
        applies: multi_call,
    },
    FallbackRule {
        reason: FallbackReason::InvalidTool,
        applies: invalid_tool,
    },
    FallbackRule {
        reason: FallbackReason::MissingArgs,
        applies: missing_args,
    },
    FallbackRule {
        reason: FallbackReason::ComplexQuery,
        applies: complex_query,
    },
    FallbackRule {
        reason: FallbackReason::LowConf,
        applies: low_conf,
    },
];

/// First matching rule's reason, or `None` to accept the local result.
fn evaluate(ctx: &RuleContext<'_>) -> Option<FallbackReason> {
    RULES
        .iter()
        .find(|rule| (rule.applies)(ctx))
        .map(|rule| rule.reason)
}

// ── Router ───────────────────────────────────────────────────────

/// The hybrid decision engine.
///
/// Holds the two generation paths as black boxes; strictly sequential per
/// request — the local attempt completes (including engine teardown)
/// before any cloud call is made.
pub struct HybridRouter {
    local: Box<dyn Generator>,
    cloud: Box<dyn Generator>,
    threshold: f64,
}

impl HybridRouter {
    /// Create a router with the default confidence threshold.
    pub fn new(local: Box<dyn Generator>, cloud: Box<dyn Generator>) -> Self {
        Self {
            local,
            cloud,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Override the confidence threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Route one request: run the local path, apply the rule chain, and
    /// either accept or escalate to cloud with a merged record.
    ///
    /// A cloud failure is fatal to the request — no retry happens here.
    pub async fn route(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> anyhow::Result<GenerationResult> {
        let local = self.local.generate(messages, tools).await?;

        let index = ToolIndex::build(tools);
        let user_text = joined_user_text(messages);
        let ctx = RuleContext {
            local: &local,
            index: &index,
            user_text: &user_text,
            threshold: self.threshold,
        };

        match evaluate(&ctx) {
            Some(reason) => {
                tracing::info!(
                    %reason,
                    local_confidence = ?local.confidence,
                    "local result rejected — escalating to cloud"
                );
                let cloud = self.cloud.generate(messages, tools).await?;
                Ok(merge_fallback(cloud, reason, &local))
            }
            None => {
                tracing::info!(
                    confidence = ?local.confidence,
                    "accepted on-device result"
                );
                let mut accepted = local;
                accepted.source = Some(SOURCE_ON_DEVICE.into());
                Ok(accepted)
            }
        }
    }
}

/// Enrich the cloud record with the fallback telemetry: reason-suffixed
/// source, the rejected local confidence, and the combined wall-clock cost
/// of both attempts.
fn merge_fallback(
    mut cloud: GenerationResult,
    reason: FallbackReason,
    local: &GenerationResult,
) -> GenerationResult {
    cloud.source = Some(format!("cloud (fallback: {})", reason.label()));
    cloud.local_confidence = local.confidence;
    cloud.total_time_ms += local.total_time_ms;
    cloud
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Deterministic generator double; counts invocations.
    struct StaticGenerator {
        result: GenerationResult,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Generator for StaticGenerator {
        fn name(&self) -> &str {
            "static"
        }

        async fn generate(
            &self,
            _messages: &[Message],
            _tools: &[ToolSpec],
        ) -> anyhow::Result<GenerationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(
            &self,
            _messages: &[Message],
            _tools: &[ToolSpec],
        ) -> anyhow::Result<GenerationResult> {
            anyhow::bail!("cloud backend unreachable")
        }
    }

    fn static_gen(result: GenerationResult) -> (Box<StaticGenerator>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(StaticGenerator {
                result,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn weather_tools() -> Vec<ToolSpec> {
        vec![ToolSpec::new("get_weather", "Get current weather for a location")
            .with_required_param("location", "string", "City name")]
    }

    fn simple_messages() -> Vec<Message> {
        vec![Message::user("What is the weather in San Francisco?")]
    }

    fn weather_call() -> FunctionCall {
        FunctionCall::new("get_weather").with_arg("location", "San Francisco")
    }

    fn local_result(calls: Vec<FunctionCall>, confidence: f64, time_ms: f64) -> GenerationResult {
        GenerationResult {
            function_calls: calls,
            total_time_ms: time_ms,
            confidence: Some(confidence),
            source: None,
            local_confidence: None,
        }
    }

    fn cloud_result() -> GenerationResult {
        GenerationResult {
            function_calls: vec![weather_call()],
            total_time_ms: 200.0,
            confidence: None,
            source: None,
            local_confidence: None,
        }
    }

    fn make_router(local: GenerationResult, cloud: GenerationResult) -> HybridRouter {
        let (local_gen, _) = static_gen(local);
        let (cloud_gen, _) = static_gen(cloud);
        HybridRouter::new(local_gen, cloud_gen)
    }

    #[tokio::test]
    async fn accepts_confident_valid_local_result() {
        let (local_gen, _) = static_gen(local_result(vec![weather_call()], 0.95, 80.0));
        let (cloud_gen, cloud_calls) = static_gen(cloud_result());
        let router = HybridRouter::new(local_gen, cloud_gen);

        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();

        assert_eq!(result.source.as_deref(), Some("on-device"));
        assert_eq!(result.function_calls, vec![weather_call()]);
        assert_eq!(result.confidence, Some(0.95));
        assert_eq!(result.total_time_ms, 80.0);
        assert!(result.local_confidence.is_none());
        assert_eq!(cloud_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_calls_falls_back() {
        let router = make_router(local_result(vec![], 0.2, 30.0), cloud_result());
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert!(result.source.unwrap().ends_with("fallback: no_calls)"));
    }

    #[tokio::test]
    async fn multi_call_falls_back() {
        let router = make_router(
            local_result(vec![weather_call(), weather_call()], 0.99, 30.0),
            cloud_result(),
        );
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert!(result.source.unwrap().ends_with("fallback: multi_call)"));
    }

    #[tokio::test]
    async fn invalid_tool_falls_back() {
        let call = FunctionCall::new("get_forecast").with_arg("location", "SF");
        let router = make_router(local_result(vec![call], 0.99, 30.0), cloud_result());
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert!(result.source.unwrap().ends_with("fallback: invalid_tool)"));
    }

    #[tokio::test]
    async fn invalid_tool_precedes_missing_args() {
        // Undeclared name AND no arguments: the name check must win.
        let call = FunctionCall::new("get_forecast");
        let router = make_router(local_result(vec![call], 0.99, 30.0), cloud_result());
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert!(result.source.unwrap().ends_with("fallback: invalid_tool)"));
    }

    #[tokio::test]
    async fn missing_args_falls_back() {
        let call = FunctionCall::new("get_weather").with_arg("unit", "celsius");
        let router = make_router(local_result(vec![call], 0.99, 30.0), cloud_result());
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert!(result.source.unwrap().ends_with("fallback: missing_args)"));
    }

    #[tokio::test]
    async fn extra_arguments_are_tolerated() {
        let call = weather_call().with_arg("mood", "optimistic");
        let router = make_router(local_result(vec![call], 0.95, 30.0), cloud_result());
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert_eq!(result.source.as_deref(), Some("on-device"));
    }

    #[tokio::test]
    async fn complex_query_falls_back_despite_full_confidence() {
        let messages = vec![Message::user(
            "Compare the weather and calculate the difference",
        )];
        let router = make_router(local_result(vec![weather_call()], 1.0, 30.0), cloud_result());
        let result = router.route(&messages, &weather_tools()).await.unwrap();
        assert!(result.source.unwrap().ends_with("fallback: complex_query)"));
    }

    #[tokio::test]
    async fn complex_keywords_match_inside_words() {
        // "authenticate" contains "then": substring semantics, not word
        // boundaries. Pinned on purpose.
        let messages = vec![Message::user("Authenticate me please")];
        let router = make_router(local_result(vec![weather_call()], 1.0, 30.0), cloud_result());
        let result = router.route(&messages, &weather_tools()).await.unwrap();
        assert!(result.source.unwrap().ends_with("fallback: complex_query)"));
    }

    #[tokio::test]
    async fn complex_keywords_scan_joined_user_messages() {
        // The keyword only appears in the second user message.
        let messages = vec![
            Message::user("What is the weather in SF"),
            Message::user("compared to LA?"),
        ];
        let router = make_router(local_result(vec![weather_call()], 1.0, 30.0), cloud_result());
        let result = router.route(&messages, &weather_tools()).await.unwrap();
        assert!(result.source.unwrap().ends_with("fallback: complex_query)"));
    }

    #[tokio::test]
    async fn assistant_text_is_ignored_by_complexity_check() {
        let messages = vec![
            Message::user("What is the weather in SF?"),
            Message::assistant("Let me compare a few sources."),
        ];
        let router = make_router(local_result(vec![weather_call()], 0.95, 30.0), cloud_result());
        let result = router.route(&messages, &weather_tools()).await.unwrap();
        assert_eq!(result.source.as_deref(), Some("on-device"));
    }

    #[tokio::test]
    async fn low_confidence_falls_back_and_carries_local_confidence() {
        let router = make_router(local_result(vec![weather_call()], 0.5, 30.0), cloud_result());
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert!(result.source.unwrap().ends_with("fallback: low_conf)"));
        assert_eq!(result.local_confidence, Some(0.5));
        assert!(result.confidence.is_none());
    }

    #[tokio::test]
    async fn confidence_equal_to_threshold_is_accepted() {
        let router = make_router(local_result(vec![weather_call()], 0.7, 30.0), cloud_result());
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert_eq!(result.source.as_deref(), Some("on-device"));
    }

    #[tokio::test]
    async fn custom_threshold_applies() {
        let (local_gen, _) = static_gen(local_result(vec![weather_call()], 0.85, 30.0));
        let (cloud_gen, _) = static_gen(cloud_result());
        let router = HybridRouter::new(local_gen, cloud_gen).with_threshold(0.9);

        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert!(result.source.unwrap().ends_with("fallback: low_conf)"));
    }

    #[tokio::test]
    async fn fallback_time_is_additive() {
        let router = make_router(local_result(vec![], 0.2, 80.0), cloud_result());
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert_eq!(result.total_time_ms, 280.0);
    }

    #[tokio::test]
    async fn fallback_keeps_cloud_calls() {
        let router = make_router(local_result(vec![], 0.2, 30.0), cloud_result());
        let result = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        assert_eq!(result.function_calls, vec![weather_call()]);
    }

    #[tokio::test]
    async fn cloud_failure_is_fatal() {
        let (local_gen, _) = static_gen(local_result(vec![], 0.2, 30.0));
        let router = HybridRouter::new(local_gen, Box::new(FailingGenerator));

        let err = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cloud backend unreachable"));
    }

    #[tokio::test]
    async fn routing_is_idempotent_with_deterministic_generators() {
        let router = make_router(local_result(vec![weather_call()], 0.5, 30.0), cloud_result());

        let first = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();
        let second = router
            .route(&simple_messages(), &weather_tools())
            .await
            .unwrap();

        assert_eq!(first.source, second.source);
        assert_eq!(first.function_calls, second.function_calls);
    }

    #[test]
    fn rule_order_matches_policy() {
        let reasons: Vec<_> = RULES.iter().map(|r| r.reason.label()).collect();
        assert_eq!(
            reasons,
            [
                "no_calls",
                "multi_call",
                "invalid_tool",
                "missing_args",
                "complex_query",
                "low_conf"
            ]
        );
    }
}
