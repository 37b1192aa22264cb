//! TLS loopback round-trip: a std-thread rustls server with a
//! self-signed certificate, the monoio client with verification
//! disabled. Exercises SNI, the handshake path, and response delivery
//! over the TLS stream.

use http::Method;
use redpath_client::Client;
use redpath_core::ConnectPolicy;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::cell::Cell;
use std::io::{Read, Write};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

fn make_rt() -> monoio::Runtime<monoio::time::TimeDriver<monoio::LegacyDriver>> {
    monoio::RuntimeBuilder::<monoio::LegacyDriver>::new()
        .enable_timer()
        .build()
        .expect("monoio runtime build failed")
}

const RESPONSE_BODY: &[u8] = br#"{"Chassis":{"@odata.id":"/redfish/v1/Chassis"}}"#;

/// Accept one TLS connection, read the request head, answer with a JSON
/// body and `connection: close`.
fn spawn_tls_server() -> (u16, std::thread::JoinHandle<()>) {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .expect("self-signed certificate generation failed");
    let cert: CertificateDer<'static> = certified.cert.der().clone();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        certified.key_pair.serialize_der(),
    ));

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert], key)
        .expect("server config build failed");

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = std::thread::spawn(move || {
        let (mut tcp, _) = listener.accept().unwrap();
        let mut conn = rustls::ServerConnection::new(Arc::new(config)).unwrap();
        {
            let mut tls = rustls::Stream::new(&mut conn, &mut tcp);

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = tls.read(&mut buf).expect("request read failed");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let text = String::from_utf8_lossy(&request);
            assert!(text.starts_with("GET /redfish/v1 HTTP/1.1\r\n"));
            assert!(text.to_ascii_lowercase().contains("host: localhost"));

            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                RESPONSE_BODY.len(),
            );
            tls.write_all(head.as_bytes()).unwrap();
            tls.write_all(RESPONSE_BODY).unwrap();
            tls.flush().unwrap();
        }
        conn.send_close_notify();
        let _ = conn.complete_io(&mut tcp);
    });

    (port, handle)
}

#[test]
fn tls_fetch_with_verification_disabled() {
    let (port, server) = spawn_tls_server();

    make_rt().block_on(async {
        let client = Client::new(ConnectPolicy {
            use_tls: true,
            verify_server_certificate: false,
        });
        assert!(client.policy().use_tls);

        let done = Rc::new(Cell::new(false));
        let done_cb = Rc::clone(&done);
        client.send_data(
            String::new(),
            "localhost",
            port,
            "/redfish/v1",
            &[],
            Method::GET,
            move |resp| {
                assert_eq!(resp.status, 200);
                assert_eq!(&resp.body[..], RESPONSE_BODY);
                assert!(!resp.keep_alive());
                done_cb.set(true);
            },
        );

        for _ in 0..2000 {
            if done.get() {
                break;
            }
            monoio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(done.get(), "TLS response never arrived");
    });

    server.join().unwrap();
}
