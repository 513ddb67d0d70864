//! Duration strings in the `<decimal><unit>` form (`500ms`, `1.5s`, `1h30m`).

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Maximum number of fractional digits that contribute to the result.
const MAX_FRACTION_DIGITS: usize = 18;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3_600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parse a duration such as `300ms`, `1.5s` or `2h45m`.
///
/// A sequence of decimal numbers, each with an optional fraction and a
/// mandatory unit suffix. The bare string `0` is accepted. Negative non-zero
/// durations are rejected because a wait cannot be negative.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let mut s = input;
    let mut negative = false;
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(format!("invalid duration {:?}", input));
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after) = s.split_at(int_len);

        let (frac_part, after) = match after.strip_prefix('.') {
            Some(rest) => {
                let frac_len = rest.bytes().take_while(u8::is_ascii_digit).count();
                rest.split_at(frac_len)
            }
            None => ("", after),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format!("invalid duration {:?}", input));
        }

        let unit_len = after
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after.len());
        if unit_len == 0 {
            return Err(format!("missing unit in duration {:?}", input));
        }
        let (unit, rest) = after.split_at(unit_len);
        let unit = unit_nanos(unit)
            .ok_or_else(|| format!("unknown unit {:?} in duration {:?}", unit, input))?;

        let overflow = || format!("invalid duration {:?}: value out of range", input);

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(unit).ok_or_else(overflow)?;

        if !frac_part.is_empty() {
            let digits = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
            let frac: u128 = digits.parse().map_err(|_| overflow())?;
            let scale = 10u128.pow(digits.len() as u32);
            nanos = nanos.checked_add(frac * unit / scale).ok_or_else(overflow)?;
        }

        total = total.checked_add(nanos).ok_or_else(overflow)?;
        s = rest;
    }

    if negative && total > 0 {
        return Err(format!("negative duration {:?} is not allowed", input));
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| format!("invalid duration {:?}: value out of range", input))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Format a duration in the same notation accepted by [`parse_duration`].
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", fixed_point(nanos, 1_000));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", fixed_point(nanos, 1_000_000));
    }

    let hours = nanos / (3_600 * NANOS_PER_SEC);
    let minutes = (nanos / (60 * NANOS_PER_SEC)) % 60;
    let seconds = nanos % (60 * NANOS_PER_SEC);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&format!("{}s", fixed_point(seconds, NANOS_PER_SEC)));
    out
}

fn fixed_point(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let rem = value % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let frac = format!("{:0width$}", rem, width = width);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
