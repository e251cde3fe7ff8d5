#![forbid(unsafe_code)]

use std::time::Duration;

use rand::Rng;
use serde_json::Value;

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// The topic used when a request doesn't supply one.
pub const DEFAULT_TOPIC    : &str  = "random";
pub const MAX_TOPIC_CHARS  : usize = 100;

// ---------------------------------------------------------------------------
// trim_topic:
// ---------------------------------------------------------------------------
/** Strip leading and trailing whitespace from a topic.  The ascii
 * information separators (U+001C to U+001F) count as whitespace too.
 */
pub fn trim_topic(topic: &str) -> &str {
    topic.trim_matches(|c: char| c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c))
}

// ---------------------------------------------------------------------------
// validate_topic:
// ---------------------------------------------------------------------------
/** Validate the topic field of a request body.  An absent field defaults to
 * the random topic.  A value that is not a string (null included), is blank
 * after trimming or has more than MAX_TOPIC_CHARS characters is rejected.
 * The length is measured on the untrimmed text.
 */
pub fn validate_topic(topic: Option<&Value>) -> Result<String, Errors> {
    let topic = match topic {
        None => return Ok(DEFAULT_TOPIC.to_string()),
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(Errors::InvalidTopic(format!("topic is not a string: {}", other)));
        }
    };

    if trim_topic(topic).is_empty() {
        return Err(Errors::InvalidTopic("topic is empty".to_string()));
    }
    let chars = topic.chars().count();
    if chars > MAX_TOPIC_CHARS {
        return Err(Errors::InvalidTopic(
            format!("topic has {} characters, the maximum is {}", chars, MAX_TOPIC_CHARS)));
    }

    Ok(topic.clone())
}

// ***************************************************************************
//                            Simulated Latency
// ***************************************************************************
// ---------------------------------------------------------------------------
// LatencyRange:
// ---------------------------------------------------------------------------
/** The inclusive range in milliseconds from which the artificial response
 * delay is drawn.  A zero range disables the delay.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, Errors> {
        if min_ms > max_ms {
            return Err(Errors::InvalidConfig(
                format!("latency_min_ms ({}) exceeds latency_max_ms ({})", min_ms, max_ms)));
        }
        Ok(Self {min_ms, max_ms})
    }

    /// Draw a delay uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }
}

// ---------------------------------------------------------------------------
// simulate_latency:
// ---------------------------------------------------------------------------
/** Pause the calling task for a random time to emulate a slower backend. */
pub async fn simulate_latency(range: LatencyRange) {
    // The thread local rng must be dropped before the await.
    let delay = range.sample(&mut rand::thread_rng());
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
