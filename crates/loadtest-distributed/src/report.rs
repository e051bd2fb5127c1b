//! Aggregated fan-out result.

use crate::registry::PeerEntry;
use std::fmt;

/// Outcome of contacting one replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerStatus {
    /// Raw response body.
    Responded(String),
    Failed(String),
    /// Not called because its share was 0 traces.
    Skipped,
}

/// One report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerOutcome {
    pub peer: PeerEntry,
    pub url: String,
    pub status: PeerStatus,
}

impl fmt::Display for PeerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PodName: {}, IP: {}, url: {}, Status: ",
            self.peer.name, self.peer.address, self.url
        )?;
        match &self.status {
            // One line per replica, whatever the peer answered.
            PeerStatus::Responded(body) => write!(f, "{}", body.trim().replace('\n', " ")),
            PeerStatus::Failed(error) => write!(f, "error: {error}"),
            PeerStatus::Skipped => write!(f, "skipped, 0 traces"),
        }
    }
}

/// Result of one fan-out: a summary plus one line per replica, in registry
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    pub per_replica: u64,
    /// `true` when no replica was discovered and the local target was used.
    pub local_fallback: bool,
    pub outcomes: Vec<PeerOutcome>,
}

impl FanoutReport {
    pub fn replicas(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, PeerStatus::Failed(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == PeerStatus::Skipped)
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.replicas() - self.failed() - self.skipped()
    }

    pub fn summary(&self) -> String {
        let target = if self.local_fallback {
            "local target"
        } else {
            "all pods"
        };
        let replicas = self.replicas();
        let noun = if replicas == 1 { "replica" } else { "replicas" };
        let mut summary = format!(
            "accepted for {target}: {replicas} {noun}, {} traces each, {} failed",
            self.per_replica,
            self.failed()
        );
        let skipped = self.skipped();
        if skipped > 0 {
            summary.push_str(&format!(", {skipped} skipped"));
        }
        summary
    }
}

impl fmt::Display for FanoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())?;
        for outcome in &self.outcomes {
            write!(f, "\n{outcome}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lines() {
        let report = FanoutReport {
            per_replica: 3,
            local_fallback: false,
            outcomes: vec![
                PeerOutcome {
                    peer: PeerEntry::new("a", "10.0.0.1"),
                    url: "http://10.0.0.1:80/gen-badger-load?traceCount=3".into(),
                    status: PeerStatus::Responded("accepted\n".into()),
                },
                PeerOutcome {
                    peer: PeerEntry::new("b", "10.0.0.2"),
                    url: "http://10.0.0.2:80/gen-badger-load?traceCount=3".into(),
                    status: PeerStatus::Failed("connection refused".into()),
                },
            ],
        };

        let text = report.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "accepted for all pods: 2 replicas, 3 traces each, 1 failed");
        assert_eq!(
            lines[1],
            "PodName: a, IP: 10.0.0.1, url: http://10.0.0.1:80/gen-badger-load?traceCount=3, Status: accepted"
        );
        assert!(lines[2].ends_with("Status: error: connection refused"));
        assert_eq!(report.succeeded(), 1);
    }

    #[test]
    fn test_single_replica_and_skipped_lines() {
        let report = FanoutReport {
            per_replica: 0,
            local_fallback: true,
            outcomes: vec![PeerOutcome {
                peer: PeerEntry::localhost(),
                url: "http://localhost:80/gen-redis-load?traceCount=0".into(),
                status: PeerStatus::Skipped,
            }],
        };

        let text = report.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "accepted for local target: 1 replica, 0 traces each, 0 failed, 1 skipped"
        );
        assert!(lines[1].ends_with("Status: skipped, 0 traces"));
        assert_eq!(report.succeeded(), 0);
    }
}
