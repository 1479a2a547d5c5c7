//! HTTP reason phrases.

/// Reason phrase for `code`, for the codes the dispatcher knows about.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    let phrase = match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        306 => "(Unused)",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    };
    Some(phrase)
}

/// Error envelope message: the reason phrase, then `: detail` if any.
pub fn error_message(code: u16, detail: Option<&str>) -> String {
    let detail = detail.filter(|d| !d.is_empty());
    match (reason_phrase(code), detail) {
        (Some(reason), Some(detail)) => format!("{}: {}", reason, detail),
        (Some(reason), None) => reason.to_string(),
        (None, Some(detail)) => detail.to_string(),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_phrases() {
        assert_eq!(reason_phrase(404), Some("Not Found"));
        assert_eq!(reason_phrase(306), Some("(Unused)"));
        assert_eq!(reason_phrase(418), None);
        assert_eq!(reason_phrase(599), None);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(404, None), "Not Found");
        assert_eq!(error_message(401, Some("")), "Unauthorized");
        assert_eq!(
            error_message(415, Some("Content type text/csv is not supported.")),
            "Unsupported Media Type: Content type text/csv is not supported."
        );
        assert_eq!(error_message(499, Some("custom")), "custom");
    }
}
