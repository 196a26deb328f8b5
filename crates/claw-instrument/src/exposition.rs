//! Prometheus text exposition helpers.
//!
//! Every metric renders through these functions so that headers, label
//! escaping and value formatting stay identical across metric types.

use std::borrow::Cow;
use std::io::Write;

use crate::types::{MetricKind, MetricName};

/// Content-Type header value for the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Label carrying the instance key of a labeled child metric.
pub const INSTANCE_LABEL: &str = "i";

/// Formats a sample value.
///
/// Finite values use the shortest representation that round-trips;
/// non-finite values use the exposition spellings `NaN`, `+Inf` and `-Inf`.
#[must_use]
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Escapes backslash, double quote and newline in a label value.
#[must_use]
pub fn escape_label_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '"', '\n']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n"),
    )
}

/// Writes the `# TYPE` line of a metric.
pub(crate) fn write_header<W: Write + ?Sized>(
    writer: &mut W,
    name: &MetricName,
    kind: MetricKind,
) -> std::io::Result<()> {
    writeln!(writer, "# TYPE {name} {kind}")
}

/// Writes one sample line: `<name><suffix>{<labels>} <value>`.
pub(crate) fn write_sample<W: Write + ?Sized>(
    writer: &mut W,
    name: &MetricName,
    suffix: &str,
    labels: &[(&str, &str)],
    value: f64,
) -> std::io::Result<()> {
    write!(writer, "{name}{suffix}")?;
    if !labels.is_empty() {
        writer.write_all(b"{")?;
        for (i, (key, val)) in labels.iter().enumerate() {
            if i > 0 {
                writer.write_all(b",")?;
            }
            write!(writer, "{key}=\"{}\"", escape_label_value(val))?;
        }
        writer.write_all(b"}")?;
    }
    writeln!(writer, " {}", format_value(value))
}

/// Returns the instance label pair for a labeled child, or nothing for the default.
pub(crate) fn instance_labels(label: Option<&str>) -> Vec<(&str, &str)> {
    label
        .map(|l| vec![(INSTANCE_LABEL, l)])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn name() -> MetricName {
        MetricName::new("rpc_latency").unwrap()
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test_case(4950.0, "4950" ; "integral")]
    #[test_case(0.5, "0.5" ; "fraction")]
    #[test_case(0.001, "0.001" ; "small fraction")]
    #[test_case(-2.25, "-2.25" ; "negative")]
    #[test_case(f64::NAN, "NaN" ; "nan")]
    #[test_case(f64::INFINITY, "+Inf" ; "positive infinity")]
    #[test_case(f64::NEG_INFINITY, "-Inf" ; "negative infinity")]
    fn value_formatting(value: f64, expected: &str) {
        assert_eq!(format_value(value), expected);
    }

    #[test]
    fn escape_plain_value_borrows() {
        assert!(matches!(escape_label_value("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn escape_special_characters() {
        assert_eq!(escape_label_value("a\"b"), "a\\\"b");
        assert_eq!(escape_label_value("a\\b"), "a\\\\b");
        assert_eq!(escape_label_value("a\nb"), "a\\nb");
    }

    #[test]
    fn header_line() {
        let out = render(|w| write_header(w, &name(), MetricKind::Summary));
        assert_eq!(out, "# TYPE rpc_latency summary\n");
    }

    #[test]
    fn sample_without_labels() {
        let out = render(|w| write_sample(w, &name(), "_count", &[], 100.0));
        assert_eq!(out, "rpc_latency_count 100\n");
    }

    #[test]
    fn sample_with_labels() {
        let out = render(|w| {
            write_sample(
                w,
                &name(),
                "",
                &[(INSTANCE_LABEL, "get"), ("quantile", "0.99")],
                f64::NAN,
            )
        });
        assert_eq!(out, "rpc_latency{i=\"get\",quantile=\"0.99\"} NaN\n");
    }

    #[test]
    fn instance_labels_default_is_empty() {
        assert!(instance_labels(None).is_empty());
        assert_eq!(instance_labels(Some("x")), vec![("i", "x")]);
    }
}
