use serde::Serialize;

/// Observed failures against a limit, with a hard override.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ThresholdCheck {
    pub observed_count: usize,
    pub limit: usize,
    pub hard_fail_triggered: bool,
}

impl ThresholdCheck {
    pub fn passed(&self) -> bool {
        self.observed_count <= self.limit && !self.hard_fail_triggered
    }
}

/// Count observations matching `mismatch`; any observation matching
/// `hard_fail` fails the check regardless of the count.
pub fn evaluate<T>(
    observations: &[T],
    limit: usize,
    mismatch: impl Fn(&T) -> bool,
    hard_fail: impl Fn(&T) -> bool,
) -> ThresholdCheck {
    ThresholdCheck {
        observed_count: observations.iter().filter(|o| mismatch(o)).count(),
        limit,
        hard_fail_triggered: observations.iter().any(|o| hard_fail(o)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes_check(codes: &[u16], limit: usize, fail_500: bool) -> ThresholdCheck {
        evaluate(
            codes,
            limit,
            |code| *code != 200,
            |code| fail_500 && (500..600).contains(code),
        )
    }

    #[test]
    fn under_limit_passes() {
        let check = codes_check(&[404, 403, 200], 3, false);
        assert_eq!(check.observed_count, 2);
        assert!(check.passed());
    }

    #[test]
    fn over_limit_fails() {
        let check = codes_check(&[404, 403, 410, 401], 3, false);
        assert_eq!(check.observed_count, 4);
        assert!(!check.passed());
    }

    #[test]
    fn hard_fail_overrides_count() {
        // (observed, desired): a deliberately expected 500 is no mismatch
        let observations = [(500u16, 500u16)];
        let check = evaluate(
            &observations,
            5,
            |(observed, desired)| observed != desired,
            |(observed, _)| *observed >= 500,
        );
        assert_eq!(check.observed_count, 0);
        assert!(check.hard_fail_triggered);
        assert!(!check.passed());
    }

    #[test]
    fn hard_fail_disabled_ignores_5xx() {
        let check = codes_check(&[503], 5, false);
        assert!(!check.hard_fail_triggered);
        assert!(check.passed());
    }
}
