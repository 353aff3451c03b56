//! Locale-free text helpers used when turning numbers and lists into prose.

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Largest value spelled out by [`number_to_words`]; larger values stay numeric.
pub const MAX_WORDS: u64 = 999_999;

/// Join items English-style: `a`, `a and b`, `a, b, and c`.
pub fn list_to_str<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [rest @ .., last] => {
            let head: Vec<&str> = rest.iter().map(AsRef::as_ref).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

/// Format a number without locale: integral values lose their decimals, others
/// keep at most two with trailing zeros removed.
pub fn num_to_str(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `value` × 1000, shifted on its shortest decimal form so that no binary
/// rounding noise is introduced (`0.0029` gives `2.9`).
pub fn milli(value: f64) -> f64 {
    if !value.is_finite() {
        return value * 1000.0;
    }
    let text = format!("{value}");
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    let frac = format!("{frac:0<3}");
    let (shifted, rest) = frac.split_at(3);
    format!("{sign}{int}{shifted}.{rest}0")
        .parse()
        .unwrap_or(value * 1000.0)
}

/// JSON number for `value`, stored as an integer when it is integral.
pub fn numeric_value(value: f64) -> serde_json::Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn below_hundred(n: u64) -> String {
    if n < 20 {
        ONES[n as usize].to_string()
    } else if n % 10 == 0 {
        TENS[(n / 10) as usize].to_string()
    } else {
        format!("{}-{}", TENS[(n / 10) as usize], ONES[(n % 10) as usize])
    }
}

fn below_thousand(n: u64) -> String {
    if n < 100 {
        return below_hundred(n);
    }
    let hundreds = format!("{} hundred", ONES[(n / 100) as usize]);
    match n % 100 {
        0 => hundreds,
        rest => format!("{hundreds} and {}", below_hundred(rest)),
    }
}

/// Cardinal English words for `n` (`21` is `twenty-one`).
pub fn number_to_words(n: u64) -> String {
    if n > MAX_WORDS {
        return n.to_string();
    }
    if n < 1000 {
        return below_thousand(n);
    }
    let thousands = format!("{} thousand", below_thousand(n / 1000));
    match n % 1000 {
        0 => thousands,
        rest if rest < 100 => format!("{thousands} and {}", below_hundred(rest)),
        rest => format!("{thousands} {}", below_thousand(rest)),
    }
}

/// Ordinal English words for `n` (`2` is `second`, `21` is `twenty-first`).
pub fn ordinal_words(n: u64) -> String {
    if n > MAX_WORDS {
        let suffix = match (n % 10, n % 100) {
            (_, 11..=13) => "th",
            (1, _) => "st",
            (2, _) => "nd",
            (3, _) => "rd",
            _ => "th",
        };
        return format!("{n}{suffix}");
    }
    let words = number_to_words(n);
    let split = words.rfind([' ', '-']).map(|i| i + 1).unwrap_or(0);
    let (head, last) = words.split_at(split);
    let last = match last {
        "one" => "first".to_string(),
        "two" => "second".to_string(),
        "three" => "third".to_string(),
        "five" => "fifth".to_string(),
        "eight" => "eighth".to_string(),
        "nine" => "ninth".to_string(),
        "twelve" => "twelfth".to_string(),
        other if other.ends_with('y') => format!("{}ieth", &other[..other.len() - 1]),
        other => format!("{other}th"),
    };
    format!("{head}{last}")
}

/// Upper-case the first character.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_to_str() {
        assert_eq!(list_to_str::<&str>(&[]), "");
        assert_eq!(list_to_str(&["a"]), "a");
        assert_eq!(list_to_str(&["a", "b"]), "a and b");
        assert_eq!(list_to_str(&["a", "b", "c"]), "a, b, and c");
        assert_eq!(
            list_to_str(&["0".to_string(), "1000".to_string(), "2000".to_string()]),
            "0, 1000, and 2000"
        );
    }

    #[test]
    fn test_num_to_str() {
        assert_eq!(num_to_str(2000.0), "2000");
        assert_eq!(num_to_str(30.0), "30");
        assert_eq!(num_to_str(2.5), "2.5");
        assert_eq!(num_to_str(1.234), "1.23");
        assert_eq!(num_to_str(0.004), "0");
        assert_eq!(num_to_str(-0.001), "0");
        assert_eq!(num_to_str(1234567.0), "1234567");
    }

    #[test]
    fn test_milli_is_decimal_exact() {
        assert_eq!(milli(2.0), 2000.0);
        assert_eq!(milli(0.0029), 2.9);
        assert_eq!(milli(0.00246), 2.46);
        assert_eq!(milli(-1.5), -1500.0);
        assert_eq!(milli(1.23456), 1234.56);
    }

    #[test]
    fn test_numeric_value() {
        assert_eq!(numeric_value(2000.0), serde_json::json!(2000));
        assert!(numeric_value(2000.0).is_i64());
        assert_eq!(numeric_value(2.5), serde_json::json!(2.5));
        assert!(numeric_value(f64::NAN).is_null());
    }

    #[test]
    fn test_number_to_words() {
        assert_eq!(number_to_words(0), "zero");
        assert_eq!(number_to_words(2), "two");
        assert_eq!(number_to_words(40), "forty");
        assert_eq!(number_to_words(42), "forty-two");
        assert_eq!(number_to_words(100), "one hundred");
        assert_eq!(number_to_words(115), "one hundred and fifteen");
        assert_eq!(number_to_words(1001), "one thousand and one");
        assert_eq!(number_to_words(2345), "two thousand three hundred and forty-five");
        assert_eq!(number_to_words(1_000_000), "1000000");
    }

    #[test]
    fn test_ordinal_words() {
        assert_eq!(ordinal_words(1), "first");
        assert_eq!(ordinal_words(2), "second");
        assert_eq!(ordinal_words(3), "third");
        assert_eq!(ordinal_words(4), "fourth");
        assert_eq!(ordinal_words(12), "twelfth");
        assert_eq!(ordinal_words(20), "twentieth");
        assert_eq!(ordinal_words(21), "twenty-first");
        assert_eq!(ordinal_words(100), "one hundredth");
        assert_eq!(ordinal_words(1_000_002), "1000002nd");
        assert_eq!(ordinal_words(1_000_011), "1000011th");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("two runs"), "Two runs");
        assert_eq!(capitalize(""), "");
    }
}
