// verify.rs - `pm verify`: check the feedback log hash chain.

use pm_store::{FeedbackLog, StoreError};

use super::Session;

pub fn execute(session: &Session) -> anyhow::Result<()> {
    let path = &session.config.feedback_log;

    if !path.exists() {
        println!("No feedback log found at {}", path.display());
        return Ok(());
    }

    match FeedbackLog::verify_chain(path) {
        Ok(count) => {
            println!(
                "Feedback log verified: {} entr{}, hash chain intact.",
                count,
                if count == 1 { "y" } else { "ies" }
            );
            Ok(())
        }
        Err(StoreError::IntegrityViolation {
            line,
            expected,
            actual,
        }) => {
            println!("INTEGRITY VIOLATION at line {}:", line);
            println!("  Expected previous_hash: {}", expected);
            println!("  Actual previous_hash:   {}", actual);
            println!();
            println!("Feedback history may have been edited or truncated.");
            anyhow::bail!("Feedback log integrity check failed");
        }
        Err(e) => Err(e.into()),
    }
}
