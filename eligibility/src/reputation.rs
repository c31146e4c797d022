//! Raw reputation to human-scale score.
//!
//! Raw reputation is an arbitrarily long signed decimal. The score is
//! `9 * (log10(|raw|) - 9) + 25`, sign-preserving, with magnitudes below
//! `10^9` clamped to the origin of 25.

/// Nudge added to the leading-digit log so exact powers of ten do not land
/// just below an integer.
const LOG_EPSILON: f64 = 1e-8;

/// Raw magnitude order mapped to the origin of the human scale.
const BASELINE_ORDER: f64 = 9.0;

const POINTS_PER_ORDER: f64 = 9.0;

const CENTER: f64 = 25.0;

/// Score a raw reputation. `None` stays `None`.
pub fn score(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let mut out = magnitude_log10(digits);
    if !out.is_finite() {
        out = 0.0;
    }
    out = (out - BASELINE_ORDER).max(0.0);
    if negative {
        out = -out;
    }
    Some(out * POINTS_PER_ORDER + CENTER)
}

/// Approximate `log10` of a decimal digit string without big-integer math:
/// the digit count gives the integer part, the leading four digits the
/// fraction. Non-numeric input yields a non-finite value.
fn magnitude_log10(digits: &str) -> f64 {
    let leading: String = digits
        .chars()
        .take(4)
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let Ok(leading) = leading.parse::<u32>() else {
        return f64::NAN;
    };

    let log = f64::from(leading).log10() + LOG_EPSILON;
    let n = digits.len() as f64 - 1.0;
    n + (log - log.trunc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn none_passes_through() {
        assert_eq!(score(None), None);
    }

    #[test]
    fn small_and_zero_reputation_sits_at_center() {
        assert!(approx(score(Some("0")).unwrap(), 25.0));
        assert!(approx(score(Some("123")).unwrap(), 25.0));
        assert!(approx(score(Some("999999999")).unwrap(), 25.0));
        assert!(approx(score(Some("")).unwrap(), 25.0));
        assert!(approx(score(Some("garbage")).unwrap(), 25.0));
    }

    #[test]
    fn powers_of_ten_do_not_flip_down() {
        // 10^12 -> log 12 -> (12 - 9) * 9 + 25 = 52
        let s = score(Some("1000000000000")).unwrap();
        assert!(s >= 52.0);
        assert!(approx(s, 52.0));
    }

    #[test]
    fn known_values() {
        // 2.5 * 10^13: log10 = 13.39794, -> (4.39794 * 9) + 25 = 64.58146
        let s = score(Some("25000000000000")).unwrap();
        assert!((s - 64.58146).abs() < 1e-4, "got {s}");

        // Only the first four digits matter for the fraction.
        let a = score(Some("12345678901234")).unwrap();
        let b = score(Some("12340000000000")).unwrap();
        assert!(approx(a, b));
    }

    #[test]
    fn explicit_plus_sign_is_positive() {
        let plus = score(Some("+25000000000000")).unwrap();
        assert!(approx(plus, score(Some("25000000000000")).unwrap()));
        assert!(plus > 64.0);
    }

    #[test]
    fn negative_reputation_mirrors_around_center() {
        let pos = score(Some("25000000000000")).unwrap();
        let neg = score(Some("-25000000000000")).unwrap();
        assert!(approx(pos - 25.0, 25.0 - neg));
        assert!(neg < 25.0);
        assert!(score(Some("-1234567890")).unwrap() < score(Some("0")).unwrap());
    }

    #[test]
    fn more_digits_scores_higher_above_baseline() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len_a = rng.gen_range(11..30);
            let len_b = rng.gen_range(len_a + 1..32);
            let digits = |len: usize, rng: &mut rand::rngs::ThreadRng| -> String {
                let mut s = rng.gen_range(1..10u8).to_string();
                for _ in 1..len {
                    s.push(char::from(b'0' + rng.gen_range(0..10u8)));
                }
                s
            };
            let a = digits(len_a, &mut rng);
            let b = digits(len_b, &mut rng);
            let sa = score(Some(&a)).unwrap();
            let sb = score(Some(&b)).unwrap();
            assert!(sb > sa, "score({b}) = {sb} should exceed score({a}) = {sa}");

            let na = score(Some(&format!("-{a}"))).unwrap();
            let nb = score(Some(&format!("-{b}"))).unwrap();
            assert!(nb < na, "negative ordering flipped for {a} / {b}");
        }
    }
}
