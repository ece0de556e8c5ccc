//! Plain-text rendering of session state for the terminal.

use std::fmt::Write;
use std::time::{Duration, Instant};

use paychat_agent::{LimitsSnapshot, Message, RateLimitNotice, TraceStatus};

pub fn message(message: &Message) -> String {
    let mut out = message.content.clone();
    for step in &message.trace {
        if matches!(step.status, TraceStatus::Ok | TraceStatus::Start) {
            continue;
        }
        let _ = write!(out, "\n  ↳ {}: {}", step.node, step.status.as_str());
    }
    for call in &message.tool_calls {
        let _ = write!(out, "\n  · {} {}", call.tool, call.args);
    }
    if let Some(approval) = &message.pending_approval {
        let _ = write!(out, "\n\nApproval needed: {}", approval.reason);
        if !approval.args.is_null() {
            let args = serde_json::to_string_pretty(&approval.args)
                .unwrap_or_else(|_| approval.args.to_string());
            let _ = write!(out, "\n{args}");
        }
        out.push_str("\n/approve or /deny");
    }
    out
}

pub fn limits(snapshot: &LimitsSnapshot) -> String {
    let mut out = format!("tier: {}", snapshot.tier);
    if snapshot.stale {
        out.push_str(" (stale)");
    }
    for (name, meter) in snapshot.limits.iter() {
        let ceiling = meter
            .max
            .map_or_else(|| "unlimited".to_string(), |max| max.to_string());
        let _ = write!(out, "\n  {name:<9} {}/{ceiling}", meter.used);
        if let Some(reset) = meter.reset_in_sec {
            let _ = write!(out, "  (resets in {reset}s)");
        }
    }
    out
}

pub fn rate_limit(notice: &RateLimitNotice, now: Instant) -> String {
    let mut out = format!("Rate limited: {}.", notice.reason.trim_end_matches('.'));
    if let Some(left) = notice.remaining(now) {
        let _ = write!(out, " Retry in {}s.", left.as_secs_f64().ceil() as u64);
    }
    out.push_str(" Use /upgrade KEY for higher limits.");
    out
}

pub fn latency(elapsed: Duration) -> String {
    format!("({:.2}s)", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paychat_agent::{ApprovalRequest, Limits, Meter, SessionId, Tier, TraceStep};

    fn assistant(content: &str) -> Message {
        let mut message = Message::user(content);
        message.role = paychat_agent::Role::Assistant;
        message
    }

    #[test]
    fn message_shows_notable_trace_and_approval() {
        let mut record = assistant("Refund of $900 needs sign-off.");
        record.trace = vec![
            TraceStep {
                node: "plan".into(),
                status: TraceStatus::Ok,
                details: None,
            },
            TraceStep {
                node: "refund".into(),
                status: TraceStatus::PendingApproval,
                details: None,
            },
        ];
        record.pending_approval = Some(ApprovalRequest {
            approval_id: "ap-1".into(),
            reason: "amount over limit".into(),
            args: serde_json::Value::Null,
        });

        let text = message(&record);

        assert!(text.starts_with("Refund of $900 needs sign-off."));
        assert!(text.contains("refund: pending_approval"));
        assert!(!text.contains("plan"));
        assert!(text.contains("Approval needed: amount over limit"));
        assert!(text.ends_with("/approve or /deny"));
    }

    #[test]
    fn limits_table() {
        let meters: Limits = [
            (
                "requests".to_string(),
                Meter {
                    used: 3,
                    max: Some(12),
                    reset_in_sec: Some(40),
                },
            ),
            (
                "tokens".to_string(),
                Meter {
                    used: 10,
                    max: None,
                    reset_in_sec: None,
                },
            ),
        ]
        .into_iter()
        .collect();
        let snapshot = LimitsSnapshot {
            session_id: SessionId::from("s-1"),
            tier: Tier::Anonymous,
            limits: meters,
            fetched_at: chrono::Utc::now(),
            stale: false,
        };

        let text = limits(&snapshot);

        assert!(text.starts_with("tier: anonymous"));
        assert!(text.contains("requests  3/12  (resets in 40s)"));
        assert!(text.contains("tokens    10/unlimited"));
    }

    #[test]
    fn rate_limit_countdown() {
        let t0 = Instant::now();
        let notice = RateLimitNotice::new("daily cap reached", Some(30), t0);
        assert_eq!(
            rate_limit(&notice, t0 + Duration::from_secs(10)),
            "Rate limited: daily cap reached. Retry in 20s. Use /upgrade KEY for higher limits."
        );
    }

    #[test]
    fn latency_two_decimals() {
        assert_eq!(latency(Duration::from_millis(1240)), "(1.24s)");
    }
}
