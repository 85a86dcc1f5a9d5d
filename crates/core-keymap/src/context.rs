// -------------------------------------------------------------------------------------------------
// PendingContext: count and register prefixes accumulated ahead of a command
// -------------------------------------------------------------------------------------------------
// Counts compose by multiplication across segments: `2d3l` is one segment before the operator
// and one after it; a mapping expansion also closes the current segment, so a target's own
// count multiplies with the one typed before the mapped key (`2dd` through `dd -> "_2dd` is 4).
// A register prefix closes the segment as well (`2"_2d$` is 4).
// -------------------------------------------------------------------------------------------------

use tracing::debug;

pub const DEFAULT_MAX_COUNT: u32 = 999_999;

#[derive(Debug, Clone)]
pub struct PendingContext {
    /// Product of completed count segments.
    sealed_count: Option<u32>,
    /// Digits of the segment being typed.
    count_digits: Option<u32>,
    pub register: Option<char>,
    pub awaiting_register: bool,
    max_count: u32,
}

impl Default for PendingContext {
    fn default() -> Self {
        Self::with_max_count(DEFAULT_MAX_COUNT)
    }
}

impl PendingContext {
    pub fn with_max_count(max_count: u32) -> Self {
        Self {
            sealed_count: None,
            count_digits: None,
            register: None,
            awaiting_register: false,
            max_count: max_count.max(1),
        }
    }

    pub fn reset_transient(&mut self) {
        self.sealed_count = None;
        self.count_digits = None;
        self.register = None;
        self.awaiting_register = false;
    }

    /// True when no count, register or register prefix is pending.
    pub fn is_idle(&self) -> bool {
        self.sealed_count.is_none()
            && self.count_digits.is_none()
            && self.register.is_none()
            && !self.awaiting_register
    }

    /// `1`..`9` start a count; `0` only extends one already started.
    pub fn accepts_count_digit(&self, c: char) -> bool {
        matches!(c, '1'..='9') || (c == '0' && self.count_digits.is_some())
    }

    pub fn push_count_digit(&mut self, c: char) {
        let Some(digit) = c.to_digit(10) else {
            return;
        };
        let new_val = self
            .count_digits
            .unwrap_or(0)
            .saturating_mul(10)
            .saturating_add(digit)
            .min(self.max_count);
        self.count_digits = Some(new_val);
        debug!(target: "input.context", count_digits = new_val, digit = %c, "count_prefix_extend");
    }

    /// Close the segment being typed; later digits start a new factor.
    pub fn seal_count(&mut self) {
        if let Some(digits) = self.count_digits.take() {
            let total = self
                .sealed_count
                .unwrap_or(1)
                .saturating_mul(digits)
                .min(self.max_count);
            self.sealed_count = Some(total);
            debug!(target: "input.context", sealed = total, "count_sealed");
        }
    }

    /// Product of every segment so far, `None` if no count was given.
    pub fn count(&self) -> Option<u32> {
        match (self.sealed_count, self.count_digits) {
            (None, None) => None,
            (sealed, digits) => Some(
                sealed
                    .unwrap_or(1)
                    .saturating_mul(digits.unwrap_or(1))
                    .min(self.max_count),
            ),
        }
    }

    pub fn take_count(&mut self) -> Option<u32> {
        let total = self.count();
        self.sealed_count = None;
        self.count_digits = None;
        total
    }

    pub fn begin_register(&mut self) {
        self.seal_count();
        self.awaiting_register = true;
        debug!(target: "input.context", awaiting_register = true, "register_prefix");
    }

    /// Accept the register designator after `"`. Invalid names cancel the
    /// prefix and return false.
    pub fn set_register(&mut self, c: char) -> bool {
        self.awaiting_register = false;
        if is_register_name(c) {
            self.register = Some(c);
            debug!(target: "input.context", register = %c, "register_set");
            true
        } else {
            debug!(target: "input.context", rejected = %c, "register_invalid");
            false
        }
    }

    pub fn take_register(&mut self) -> Option<char> {
        self.register.take()
    }
}

/// Named (`a`-`z`, `A`-`Z`), numbered and special registers.
pub fn is_register_name(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '"' | '-' | '_' | '*' | '+' | '.' | ':' | '/' | '%' | '#' | '=')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(ctx: &mut PendingContext, s: &str) {
        for c in s.chars() {
            assert!(ctx.accepts_count_digit(c), "digit {c} rejected");
            ctx.push_count_digit(c);
        }
    }

    #[test]
    fn leading_zero_is_not_a_count() {
        let ctx = PendingContext::default();
        assert!(!ctx.accepts_count_digit('0'));
        assert!(ctx.accepts_count_digit('1'));
    }

    #[test]
    fn zero_extends_started_count() {
        let mut ctx = PendingContext::default();
        digits(&mut ctx, "10");
        assert_eq!(ctx.count(), Some(10));
    }

    #[test]
    fn sealed_segments_multiply() {
        let mut ctx = PendingContext::default();
        digits(&mut ctx, "2");
        ctx.seal_count();
        digits(&mut ctx, "3");
        assert_eq!(ctx.take_count(), Some(6));
        assert_eq!(ctx.count(), None);
    }

    #[test]
    fn register_prefix_seals_count() {
        let mut ctx = PendingContext::default();
        digits(&mut ctx, "2");
        ctx.begin_register();
        assert!(ctx.set_register('_'));
        digits(&mut ctx, "2");
        assert_eq!(ctx.count(), Some(4));
        assert_eq!(ctx.take_register(), Some('_'));
    }

    #[test]
    fn invalid_register_rejected() {
        let mut ctx = PendingContext::default();
        ctx.begin_register();
        assert!(!ctx.set_register('!'));
        assert!(ctx.register.is_none());
        assert!(!ctx.awaiting_register);
    }

    #[test]
    fn counts_clamp_at_max() {
        let mut ctx = PendingContext::with_max_count(50);
        digits(&mut ctx, "99");
        assert_eq!(ctx.count(), Some(50));
        ctx.seal_count();
        digits(&mut ctx, "9");
        assert_eq!(ctx.count(), Some(50));
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut ctx = PendingContext::default();
        digits(&mut ctx, "3");
        ctx.begin_register();
        ctx.reset_transient();
        assert!(ctx.is_idle());
    }
}
