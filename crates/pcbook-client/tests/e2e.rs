#![allow(clippy::unwrap_used, clippy::expect_used)] // Integration tests use unwrap for brevity

//! End-to-end tests: a real server on a loopback port driven through the
//! client library.

use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::Code;
use tonic::transport::{Channel, Server};

use pcbook_client::{
    AuthClient, BearerAuth, ConnectionConfig, LaptopClient, TokenSource, connect, spawn_refresh,
};
use pcbook_proto::v1::{Cpu, Filter, Laptop, Memory, memory};
use pcbook_server::config::ServerConfig;
use pcbook_server::server::PcbookServer;

struct TestServer {
    channel: Channel,
    image_dir: TempDir,
}

async fn start_server() -> TestServer {
    let image_dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        image_dir: image_dir.path().to_path_buf(),
        ..Default::default()
    };
    let server = PcbookServer::from_config(&config).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut builder = Server::builder();
    let router = server.into_router(&mut builder);
    tokio::spawn(router.serve_with_incoming(TcpListenerStream::new(listener)));

    let channel = connect(&ConnectionConfig::new(format!("http://{addr}")))
        .await
        .unwrap();
    TestServer { channel, image_dir }
}

async fn laptop_client(server: &TestServer, username: &str) -> LaptopClient {
    let token = AuthClient::new(server.channel.clone(), username, "123456")
        .login()
        .await
        .unwrap();
    LaptopClient::new(server.channel.clone(), BearerAuth::new(TokenSource::new(token)))
}

fn anonymous_client(server: &TestServer) -> LaptopClient {
    LaptopClient::new(server.channel.clone(), BearerAuth::new(TokenSource::default()))
}

fn laptop(price_usd: f64) -> Laptop {
    Laptop {
        brand: "Dell".into(),
        name: "XPS 13".into(),
        cpu: Some(Cpu {
            brand: "Intel".into(),
            name: "Core i7".into(),
            number_cores: 8,
            number_threads: 16,
            min_ghz: 3.0,
            max_ghz: 4.5,
        }),
        ram: Some(Memory {
            value: 16,
            unit: memory::Unit::Gigabyte.into(),
        }),
        price_usd,
        release_year: 2023,
        ..Default::default()
    }
}

fn cheap_filter() -> Filter {
    Filter {
        max_price_usd: 2000.0,
        min_cpu_cores: 4,
        min_cpu_ghz: 2.5,
        min_ram: Some(Memory {
            value: 8,
            unit: memory::Unit::Gigabyte.into(),
        }),
    }
}

#[tokio::test]
async fn admin_runs_the_whole_catalog_flow() {
    let server = start_server().await;
    let admin = laptop_client(&server, "user1").await;

    let id = admin.create_laptop(laptop(1500.0)).await.unwrap();
    admin.create_laptop(laptop(3500.0)).await.unwrap();

    let found = admin.search_laptops(cheap_filter()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);

    let image = vec![7u8; 5000];
    let uploaded = admin.upload_image(&id, ".jpg", &image).await.unwrap();
    assert_eq!(uploaded.size, 5000);
    let written = server
        .image_dir
        .path()
        .join(format!("{}.jpg", uploaded.id));
    assert_eq!(std::fs::read(written).unwrap(), image);

    let replies = admin
        .rate_laptops(&[(id.clone(), 9.0), (id.clone(), 7.0)])
        .await
        .unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1].rated_count, 2);
    assert!((replies[1].average_score - 8.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn standard_user_may_rate_but_not_create() {
    let server = start_server().await;
    let admin = laptop_client(&server, "user1").await;
    let user = laptop_client(&server, "user2").await;

    let err = user.create_laptop(laptop(1000.0)).await.unwrap_err();
    assert_eq!(err.code(), Some(Code::PermissionDenied));

    let id = admin.create_laptop(laptop(1000.0)).await.unwrap();
    let err = user.upload_image(&id, ".png", b"img").await.unwrap_err();
    assert_eq!(err.code(), Some(Code::PermissionDenied));

    let replies = user.rate_laptops(&[(id, 5.0)]).await.unwrap();
    assert_eq!(replies[0].rated_count, 1);
}

#[tokio::test]
async fn anonymous_callers_may_only_search() {
    let server = start_server().await;
    let admin = laptop_client(&server, "user1").await;
    admin.create_laptop(laptop(1200.0)).await.unwrap();

    let anonymous = anonymous_client(&server);
    assert_eq!(anonymous.search_laptops(cheap_filter()).await.unwrap().len(), 1);

    let err = anonymous.create_laptop(laptop(1200.0)).await.unwrap_err();
    assert_eq!(err.code(), Some(Code::Unauthenticated));
    let err = anonymous.rate_laptops(&[("x".into(), 1.0)]).await.unwrap_err();
    assert_eq!(err.code(), Some(Code::Unauthenticated));
}

#[tokio::test]
async fn forged_token_is_unauthenticated() {
    let server = start_server().await;
    let forged = LaptopClient::new(
        server.channel.clone(),
        BearerAuth::new(TokenSource::new("eyJhbGciOiJIUzI1NiJ9.e30.bogus")),
    );
    let err = forged.create_laptop(laptop(1.0)).await.unwrap_err();
    assert_eq!(err.code(), Some(Code::Unauthenticated));
}

#[tokio::test]
async fn wrong_password_is_not_found() {
    let server = start_server().await;
    let err = AuthClient::new(server.channel.clone(), "user1", "wrong")
        .login()
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(Code::NotFound));
}

#[tokio::test]
async fn duplicate_and_malformed_ids_are_rejected() {
    let server = start_server().await;
    let admin = laptop_client(&server, "user1").await;

    let id = admin.create_laptop(laptop(1.0)).await.unwrap();
    let mut dup = laptop(1.0);
    dup.id = id;
    let err = admin.create_laptop(dup).await.unwrap_err();
    assert_eq!(err.code(), Some(Code::AlreadyExists));

    let mut bad = laptop(1.0);
    bad.id = "not-a-uuid".into();
    let err = admin.create_laptop(bad).await.unwrap_err();
    assert_eq!(err.code(), Some(Code::InvalidArgument));
}

#[tokio::test]
async fn oversize_upload_is_rejected() {
    let server = start_server().await;
    let admin = laptop_client(&server, "user1").await.with_chunk_size(64 * 1024);
    let id = admin.create_laptop(laptop(1.0)).await.unwrap();

    let too_big = vec![0u8; (1 << 20) + 1];
    let err = admin.upload_image(&id, ".bin", &too_big).await.unwrap_err();
    assert_eq!(err.code(), Some(Code::InvalidArgument));
    assert_eq!(std::fs::read_dir(server.image_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn upload_for_unknown_laptop_is_not_found() {
    let server = start_server().await;
    let admin = laptop_client(&server, "user1").await;
    let err = admin
        .upload_image("00000000-0000-4000-8000-000000000000", ".jpg", b"x")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(Code::NotFound));
}

#[tokio::test]
async fn refresh_task_supplies_a_token() {
    let server = start_server().await;
    let tokens = TokenSource::default();
    let _refresh = spawn_refresh(
        AuthClient::new(server.channel.clone(), "user1", "123456"),
        tokens.clone(),
        Duration::from_millis(50),
    );

    tokio::time::timeout(Duration::from_secs(5), async {
        while tokens.get().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("refresh task never logged in");

    let admin = LaptopClient::new(server.channel.clone(), BearerAuth::new(tokens));
    admin.create_laptop(laptop(1.0)).await.unwrap();
}
