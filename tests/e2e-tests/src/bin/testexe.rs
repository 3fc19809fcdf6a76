use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};

/// Small HTTP service used as the launched process in end-to-end tests
#[derive(Parser, Debug)]
#[command(name = "testexe")]
#[command(about = "Echo service for liveprobe testing", long_about = None)]
struct Args {
    /// Port to listen on (127.0.0.1)
    #[arg(long)]
    port: Option<u16>,

    /// Seconds to run before exiting on its own (0 = run until signalled)
    #[arg(long, default_value = "0")]
    run_duration: u64,

    /// Milliseconds to wait before binding the port
    #[arg(long, default_value = "0")]
    startup_delay_ms: u64,

    /// Exit code to return on shutdown
    #[arg(long, default_value = "0")]
    exit_code: i32,

    /// Keep running after SIGTERM so only SIGKILL stops the process
    #[arg(long)]
    ignore_sigterm: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Starting testexe with args: {:?}", args);

    if args.startup_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(args.startup_delay_ms)).await;
    }

    let server = args.port.map(|port| tokio::spawn(run_server(port)));

    let run_for = async {
        if args.run_duration > 0 {
            tokio::time::sleep(Duration::from_secs(args.run_duration)).await;
            info!("Run duration elapsed");
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = run_for => {}
        _ = wait_for_shutdown(args.ignore_sigterm) => {}
    }

    if let Some(server) = server {
        server.abort();
    }

    info!("Exiting with code {}", args.exit_code);
    std::process::exit(args.exit_code);
}

#[cfg(unix)]
async fn wait_for_shutdown(ignore_sigterm: bool) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            return std::future::pending().await;
        }
    };

    loop {
        sigterm.recv().await;
        if ignore_sigterm {
            warn!("Ignoring SIGTERM");
            continue;
        }
        info!("Received SIGTERM");
        return;
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_ignore_sigterm: bool) {
    let _ = tokio::signal::ctrl_c().await;
}

async fn run_server(port: u16) {
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;
    use tokio::net::TcpListener;

    let listener = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind port {}: {}", port, e);
            std::process::exit(2);
        }
    };
    info!("Listening on 127.0.0.1:{}", port);

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(respond))
                .await
            {
                warn!("Connection error: {}", e);
            }
        });
    }
}

async fn respond(
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<hyper::Response<http_body_util::Full<hyper::body::Bytes>>, hyper::Error> {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::{Response, StatusCode};

    let (status, body) = match req.uri().path() {
        "/health" => (StatusCode::OK, serde_json::json!({ "status": "healthy" })),
        "/facts" => (
            StatusCode::OK,
            serde_json::json!({ "facts": [{ "id": 1, "category": "space", "fact": "A day on Venus is longer than its year." }] }),
        ),
        "/facts/categories" => (StatusCode::OK, serde_json::json!({ "categories": ["space"] })),
        _ => (StatusCode::NOT_FOUND, serde_json::json!({ "error": "not found" })),
    };

    info!("{} {} -> {}", req.method(), req.uri().path(), status.as_u16());

    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new()))))
}
