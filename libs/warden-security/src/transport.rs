//! Transport extension for identities created inside a request/response exchange.
//!
//! The core never looks inside an exchange beyond [`TransportExchange::remote_host`].
//! Session managers that know the concrete transport can downcast through
//! [`TransportExchange::as_any`].

use std::any::Any;
use std::fmt;

/// Request/response handles carried by a transport-aware identity.
pub trait TransportExchange: fmt::Debug + Send + Sync {
    /// Address of the remote peer, if the transport knows it.
    fn remote_host(&self) -> Option<String>;

    fn as_any(&self) -> &dyn Any;
}

#[cfg(feature = "http")]
pub use self::http_exchange::HttpExchange;

#[cfg(feature = "http")]
mod http_exchange {
    use std::any::Any;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use http::HeaderMap;
    use http::request::Parts;
    use parking_lot::Mutex;

    use super::TransportExchange;

    const FORWARDED_FOR: &str = "x-forwarded-for";

    /// HTTP exchange: the inbound request head and the outbound response headers.
    ///
    /// Response headers are shared so that session creation deep inside a call
    /// chain can still emit e.g. a session cookie.
    #[derive(Debug, Clone)]
    pub struct HttpExchange {
        request: Arc<Parts>,
        response_headers: Arc<Mutex<HeaderMap>>,
    }

    impl HttpExchange {
        #[must_use]
        pub fn new(request: Parts) -> Self {
            Self {
                request: Arc::new(request),
                response_headers: Arc::new(Mutex::new(HeaderMap::new())),
            }
        }

        #[must_use]
        pub fn request(&self) -> &Parts {
            &self.request
        }

        /// Shared response headers; callers lock for the duration of an edit.
        #[must_use]
        pub fn response_headers(&self) -> Arc<Mutex<HeaderMap>> {
            Arc::clone(&self.response_headers)
        }
    }

    impl TransportExchange for HttpExchange {
        fn remote_host(&self) -> Option<String> {
            let forwarded = self
                .request
                .headers
                .get(FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned);

            forwarded.or_else(|| {
                self.request
                    .extensions
                    .get::<SocketAddr>()
                    .map(|addr| addr.ip().to_string())
            })
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[cfg(test)]
    #[cfg_attr(coverage_nightly, coverage(off))]
    mod tests {
        use super::*;

        fn parts(builder: http::request::Builder) -> Parts {
            builder.body(()).unwrap().into_parts().0
        }

        #[test]
        fn remote_host_prefers_forwarded_header() {
            let exchange = HttpExchange::new(parts(
                http::Request::builder()
                    .uri("/login")
                    .header(FORWARDED_FOR, "203.0.113.9, 10.0.0.1"),
            ));
            assert_eq!(exchange.remote_host().as_deref(), Some("203.0.113.9"));
        }

        #[test]
        fn remote_host_falls_back_to_socket_addr() {
            let mut head = parts(http::Request::builder().uri("/"));
            head.extensions
                .insert("198.51.100.4:55000".parse::<SocketAddr>().unwrap());

            let exchange = HttpExchange::new(head);
            assert_eq!(exchange.remote_host().as_deref(), Some("198.51.100.4"));
        }

        #[test]
        fn remote_host_absent_without_metadata() {
            let exchange = HttpExchange::new(parts(http::Request::builder().uri("/")));
            assert!(exchange.remote_host().is_none());
        }
    }
}
