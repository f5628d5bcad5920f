use anyhow::Result;
use ll_client::Response;
use ll_core::OutputFormat;
use serde_json::{Value, json};

/// JSON rendering of a response; a JSON body is embedded as a value, anything else as a string.
pub(crate) fn response_json(response: &Response) -> Value {
    let body = serde_json::from_str::<Value>(&response.text)
        .unwrap_or_else(|_| Value::String(response.text.clone()));
    json!({
        "success": response.success,
        "status_code": response.status_code,
        "body": body,
        "error": response.error_data,
        "failure": response.failure,
    })
}

pub(crate) fn print_response(response: &Response, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response_json(response))?);
        }
        OutputFormat::Text if response.success => println!("{}", response.text),
        OutputFormat::Text => {
            let message = response
                .error_data
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| response.text.clone());
            eprintln!("Request failed (status {}): {message}", response.status_code);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ll_client::ErrorData;

    #[test]
    fn test_json_body_is_embedded() {
        let value = response_json(&Response::success(200, r#"{"id":7}"#));
        assert_eq!(value["body"]["id"], 7);
        assert_eq!(value["success"], true);
        assert_eq!(value["error"], Value::Null);
    }

    #[test]
    fn test_failure_fields() {
        let response = Response::http_failure(
            503,
            "<html></html>",
            ErrorData::synthetic(503, "<html></html>"),
        );
        let value = response_json(&response);
        assert_eq!(value["body"], "<html></html>");
        assert_eq!(value["status_code"], 503);
        assert_eq!(value["failure"], "http");
        assert_eq!(value["error"]["code"], "HTTP503");
    }
}
