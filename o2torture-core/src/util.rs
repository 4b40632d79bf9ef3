// vim: tw=80
//! Common utility functions used throughout o2torture

use rand::{thread_rng, Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use tracing::info;

/// Divide two unsigned numbers (usually integers), rounding up.
pub fn div_roundup(dividend: u64, divisor: u64) -> u64 {
    dividend.div_ceil(divisor)
}

/// Round `x` up to the next multiple of `align`
pub fn roundup(x: u64, align: u64) -> u64 {
    div_roundup(x, align) * align
}

/// Parse a byte count the way the classic ocfs2 test tools did.
///
/// The number may be decimal, `0x`-prefixed hex, or `0`-prefixed octal,
/// followed by an optional single suffix: `b` for bytes, `k`, `m`, or `g` for
/// binary multiples.  Suffixes are case-insensitive.
pub fn parse_size(s: &str) -> std::result::Result<u64, String> {
    let bad = || format!("invalid size {s:?}");
    let (digits, mult) = match s.char_indices().last() {
        None => return Err(bad()),
        Some((i, c)) => match c.to_ascii_lowercase() {
            'b' if !s.starts_with("0x") && !s.starts_with("0X") =>
                (&s[..i], 1),
            'k' => (&s[..i], 1 << 10),
            'm' => (&s[..i], 1 << 20),
            'g' => (&s[..i], 1 << 30),
            _ => (s, 1)
        }
    };
    let num = if let Some(hex) = digits.strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<u64>()
    }.map_err(|_| bad())?;
    num.checked_mul(mult).ok_or_else(bad)
}

/// A random uppercase ASCII letter, the classic verification pattern byte
pub fn rand_upper<R: Rng>(rng: &mut R) -> u8 {
    rng.gen_range(b'A'..=b'Z')
}

/// Build the deterministic RNG used by the seeded programs.
///
/// Without an explicit seed a fresh one is drawn.  Either way it is printed to
/// stderr, so a failing run can be replayed with `--seed`.  Stdout is left
/// alone since some programs write their logs there.
pub fn seeded_rng(seed: Option<u64>) -> (u64, XorShiftRng) {
    let seed = seed.unwrap_or_else(|| thread_rng().gen());
    eprintln!("Using seed {seed}");
    info!(seed, "seeding RNG");
    // Use XorShiftRng because it's deterministic and seedable
    (seed, XorShiftRng::seed_from_u64(seed))
}

// LCOV_EXCL_STOP
