//! Integration tests with mock HTTP server

mod executor_http;
mod mock_server;
mod platforms_http;
