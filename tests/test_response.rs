use pushparse::http::response::{Response, ResponseBuilder, StatusCode};
use pushparse::http::writer::serialize_response;

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"This is the body".to_vec();
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(body.clone())
        .build();

    assert_eq!(response.header("content-length").unwrap(), body.len().to_string());
}

#[test]
fn test_response_builder_preserves_custom_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Length", "999")
        .body(b"test".to_vec())
        .build();

    // Should keep the custom value
    assert_eq!(response.header("Content-Length").unwrap(), "999");
    assert_eq!(response.headers.len(), 1);
}

#[test]
fn test_response_builder_replaces_same_header() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Server", "a")
        .header("server", "b")
        .build();

    assert_eq!(response.headers.len(), 2); // Server + auto Content-length
    assert_eq!(response.header("Server").unwrap(), "b");
}

#[test]
fn test_echo_response_headers_in_order() {
    let response = Response::echo("pushparse", b"payload".to_vec());
    let names: Vec<&str> = response.headers.iter().map(|(k, _)| k.as_str()).collect();

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(names, vec!["Server", "Connection", "Content-length"]);
    assert_eq!(response.header("Connection").unwrap(), "close");
    assert_eq!(response.header("Content-length").unwrap(), "7");
    assert_eq!(response.body, b"payload".to_vec());
}

#[test]
fn test_echo_empty_body_wire_format() {
    let wire = serialize_response(&Response::echo("my_server", Vec::new()));
    assert_eq!(
        wire,
        b"HTTP/1.1 200 OK\r\nServer: my_server\r\nConnection: close\r\nContent-length: 0\r\n\r\n"
            .to_vec()
    );
}

#[test]
fn test_bad_request_helper() {
    let response = Response::bad_request("pushparse");
    let wire = String::from_utf8(serialize_response(&response)).unwrap();

    assert_eq!(response.status, StatusCode::BadRequest);
    assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(wire.ends_with("Content-length: 0\r\n\r\n"));
}
