//! Load testing for the rewriting proxy.

use std::time::Instant;

use common::{client, test_config, MockResponse, MockUpstream, TestProxy};

mod common;

#[tokio::test]
async fn test_concurrent_rewrites() {
    let upstream = MockUpstream::fixed(
        MockResponse::new(
            200,
            "body{background:url(/img/bg.png)}@import '/theme.css';",
        )
        .header("Content-Type", "text/css"),
    )
    .await;
    let proxy = TestProxy::start(test_config()).await;
    let token = upstream.token(&proxy.codec);
    let expected = format!(
        "body{{background:url(/r/{token}/img/bg.png)}}@import '/r/{token}/theme.css';"
    );

    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = client();
    let url = proxy.url(&format!("/r/{token}/style.css"));
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = url.clone();
        let expected = expected.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                let res = client.get(&url).send().await.unwrap();
                assert!(res.status().is_success());
                assert_eq!(res.text().await.unwrap(), expected);
                latencies.push(req_start.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    assert_eq!(all_latencies.len(), total_requests);
    assert_eq!(upstream.requests().len(), total_requests);

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", total_requests as f64 / duration.as_secs_f64());
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");
}
