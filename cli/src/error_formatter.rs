use ariadne::{Color, Label, Report, ReportKind, Source};
use rulemancer::RulemancerError;

/// Format a RulemancerError with source labels using Ariadne
pub fn format_error(error: &RulemancerError) -> String {
    match error {
        RulemancerError::Parse(details) | RulemancerError::Semantic(details) => {
            let mut output = Vec::new();

            let error_type = match error {
                RulemancerError::Parse(_) => "Parse error",
                _ => "Semantic error",
            };

            let message = format!(
                "{}: {} ({}:{}:{})",
                error_type, details.message, details.source_id, details.span.line, details.span.col
            );

            let mut report =
                Report::build(ReportKind::Error, &details.source_id, details.span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((&details.source_id, details.span.start..details.span.end))
                            .with_message("")
                            .with_color(Color::Red),
                    );

            if let Some(suggestion) = &details.suggestion {
                report = report.with_help(suggestion);
            }

            match report.finish().write(
                (
                    &details.source_id,
                    Source::from(details.source_text.as_ref()),
                ),
                &mut output,
            ) {
                Ok(_) => String::from_utf8_lossy(&output).to_string(),
                Err(_) => format!("{}", error),
            }
        }
        RulemancerError::Runtime(msg) => format!("Runtime error: {}", msg),
        RulemancerError::Engine(msg) => format!("Engine error: {}", msg),
        RulemancerError::Io { path, message } => format!("Cannot read {}: {}", path, message),
        RulemancerError::ResourceLimitExceeded {
            limit_name,
            limit_value,
            actual_value,
            suggestion,
        } => {
            format!(
                "Resource limit exceeded: {}\n  Limit: {}\n  Actual: {}\n  {}",
                limit_name, limit_value, actual_value, suggestion
            )
        }
        RulemancerError::MultipleErrors(errors) => {
            let mut result = String::from("Multiple errors occurred:\n\n");
            for error in errors {
                result.push_str(&format_error(error));
                result.push_str("\n\n");
            }
            result
        }
    }
}
