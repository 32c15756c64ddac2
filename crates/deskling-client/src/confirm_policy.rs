//! Confirmation policy for assistant tool plans.
//!
//! A plan needs a human grant when any proposed tool is `medium` or `high`
//! risk. Both functions are infallible: malformed plans degrade to "no
//! confirmation" and an empty tool list.

use deskling_proto::{
    AssistantPlan, CONFIRM_TTL_SECONDS, ConfirmGrant, GRANT_DECISION_APPROVED, PlanTool,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    /// Normalize a raw risk label; case is ignored, whitespace is not.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("low") => Self::Low,
            Some("medium") => Self::Medium,
            Some("high") => Self::High,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn requires_confirmation(self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }
}

fn risk_level(tool: &PlanTool) -> RiskLevel {
    RiskLevel::parse(tool.risk.as_deref())
}

#[must_use]
pub fn requires_confirmation(plan: Option<&AssistantPlan>) -> bool {
    plan.and_then(|plan| plan.proposed_tools.as_deref())
        .is_some_and(|tools| tools.iter().any(|tool| risk_level(tool).requires_confirmation()))
}

/// Grant authorizing every named tool of `plan` under `trace_id`.
#[must_use]
pub fn build_confirm_grant(plan: Option<&AssistantPlan>, trace_id: &str) -> ConfirmGrant {
    let tools = plan
        .map(AssistantPlan::tools)
        .unwrap_or_default()
        .iter()
        .filter_map(|tool| tool.name.as_deref())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    ConfirmGrant {
        confirm_token: format!("confirm_{trace_id}"),
        tools,
        ttl_seconds: CONFIRM_TTL_SECONDS,
        decision: GRANT_DECISION_APPROVED.to_string(),
    }
}

/// Human-readable prompt line for one tool.
#[must_use]
pub fn describe_tool(tool: &PlanTool) -> String {
    let name = tool
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or("unknown.tool");
    let risk = tool
        .risk
        .as_deref()
        .filter(|risk| !risk.is_empty())
        .unwrap_or("unknown");
    format!("{name} ({risk})")
}

#[cfg(test)]
mod tests {
    use deskling_proto::{AssistantPlan, PlanTool};
    use quickcheck::QuickCheck;
    use serde_json::json;

    use super::{RiskLevel, build_confirm_grant, describe_tool, requires_confirmation};

    fn tool(name: Option<&str>, risk: Option<&str>) -> PlanTool {
        PlanTool {
            name: name.map(str::to_string),
            risk: risk.map(str::to_string),
        }
    }

    fn plan_of(tools: Vec<PlanTool>) -> AssistantPlan {
        AssistantPlan {
            summary: None,
            proposed_tools: Some(tools),
        }
    }

    #[test]
    fn medium_or_high_risk_requires_confirmation() {
        assert!(requires_confirmation(Some(&plan_of(vec![
            tool(Some("files.read_text"), Some("low")),
            tool(Some("files.write_text"), Some("Medium")),
        ]))));
        assert!(requires_confirmation(Some(&plan_of(vec![tool(
            Some("shell.exec"),
            Some("HIGH")
        )]))));
    }

    #[test]
    fn low_missing_or_unknown_risk_never_requires_confirmation() {
        assert!(!requires_confirmation(None));
        assert!(!requires_confirmation(Some(&AssistantPlan::default())));
        assert!(!requires_confirmation(Some(&plan_of(Vec::new()))));
        assert!(!requires_confirmation(Some(&plan_of(vec![
            tool(Some("files.read_text"), Some("low")),
            tool(Some("browser.open_url"), None),
            tool(Some("clock.now"), Some("critical")),
            tool(Some("shell.exec"), Some(" high ")),
        ]))));
    }

    #[test]
    fn non_list_tool_field_never_requires_confirmation() {
        let plan = AssistantPlan::from_payload(&json!({"proposed_tools": {"risk": "high"}}));
        assert!(!requires_confirmation(Some(&plan)));
    }

    #[test]
    fn grant_matches_worked_example() {
        let plan = plan_of(vec![
            tool(Some("files.write_text"), Some("medium")),
            tool(None, Some("high")),
            tool(Some(""), Some("high")),
            tool(Some("browser.open_url"), Some("low")),
        ]);
        let grant = build_confirm_grant(Some(&plan), "trace123");
        assert_eq!(grant.confirm_token, "confirm_trace123");
        assert_eq!(grant.tools, ["files.write_text", "browser.open_url"]);
        assert_eq!(grant.ttl_seconds, 60);
        assert_eq!(grant.decision, "approved");
    }

    #[test]
    fn grant_for_absent_plan_has_no_tools() {
        let grant = build_confirm_grant(None, "t-1");
        assert!(grant.tools.is_empty());
        assert_eq!(grant.confirm_token, "confirm_t-1");
    }

    #[test]
    fn risk_level_normalizes_labels() {
        assert_eq!(RiskLevel::parse(Some("hIgH")), RiskLevel::High);
        assert_eq!(RiskLevel::parse(Some(" high\n")), RiskLevel::Unknown);
        assert_eq!(RiskLevel::parse(Some("Low")), RiskLevel::Low);
        assert_eq!(RiskLevel::parse(Some("")), RiskLevel::Unknown);
        assert_eq!(RiskLevel::parse(None), RiskLevel::Unknown);
        assert_eq!(RiskLevel::Medium.as_str(), "medium");
    }

    #[test]
    fn prompt_lines_fill_missing_fields() {
        assert_eq!(
            describe_tool(&tool(Some("files.write_text"), Some("medium"))),
            "files.write_text (medium)"
        );
        assert_eq!(describe_tool(&tool(None, None)), "unknown.tool (unknown)");
    }

    fn prop_grant_keeps_named_tools_in_order(entries: Vec<(Option<String>, Option<String>)>) -> bool {
        let plan = plan_of(
            entries
                .iter()
                .map(|(name, risk)| PlanTool {
                    name: name.clone(),
                    risk: risk.clone(),
                })
                .collect(),
        );
        let expected = entries
            .iter()
            .filter_map(|(name, _)| name.clone())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        let grant = build_confirm_grant(Some(&plan), "trace");
        grant.tools == expected && grant.confirm_token == "confirm_trace"
    }

    fn prop_confirmation_matches_any_risky_tool(risks: Vec<Option<String>>) -> bool {
        let plan = plan_of(risks.iter().map(|risk| tool(Some("t"), risk.as_deref())).collect());
        let risky = risks.iter().flatten().any(|risk| {
            let normalized = risk.to_ascii_lowercase();
            normalized == "medium" || normalized == "high"
        });
        requires_confirmation(Some(&plan)) == risky
    }

    #[test]
    fn grant_tool_order_property() {
        QuickCheck::new().quickcheck(
            prop_grant_keeps_named_tools_in_order as fn(Vec<(Option<String>, Option<String>)>) -> bool,
        );
    }

    #[test]
    fn confirmation_property() {
        QuickCheck::new()
            .quickcheck(prop_confirmation_matches_any_risky_tool as fn(Vec<Option<String>>) -> bool);
    }
}
