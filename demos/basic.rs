//! Basic example demonstrating the Basecamp API client.
//!
//! Run with:
//! ```
//! BASECAMP_ACCESS_TOKEN=your-token BASECAMP_ACCOUNT_ID=your-account cargo run --example basic
//! ```

use std::sync::Arc;
use std::time::Duration;

use bcapi::{
    BasecampClient, ClientConfig, Get, List, PageLimits, Project, ProjectListQuery, RetryPolicy,
    TracingHooks,
};

#[tokio::main]
async fn main() -> bcapi::Result<()> {
    // Initialize tracing for debugging (optional)
    tracing_subscriber::fmt::init();

    let token = std::env::var("BASECAMP_ACCESS_TOKEN").unwrap_or_default();
    let account_id = std::env::var("BASECAMP_ACCOUNT_ID").unwrap_or_default();

    // Tighter retries than the defaults, with every lifecycle event logged
    println!("Creating Basecamp client...");
    let client = BasecampClient::builder(token, account_id)
        .config(ClientConfig {
            retry: RetryPolicy::default()
                .max_attempts(4)
                .base_delay(Duration::from_millis(500)),
            ..ClientConfig::default()
        })
        .hooks(Arc::new(TracingHooks::default()))
        .build()?;
    println!("Connected to: {} (account {})", client.base_url(), client.account_id());

    // First page only
    println!("\n--- Listing Projects (first page) ---");
    let first_page = Project::list_page(&client, &ProjectListQuery::default()).await?;
    println!(
        "Found {} projects on page 1 (total: {:?}, more: {})",
        first_page.len(),
        first_page.total_count,
        first_page.has_more()
    );

    for project in &first_page {
        println!("  - {} ({})", project.name, project.id);
    }

    // Up to 50 projects across pages
    println!("\n--- Listing Projects (up to 50) ---");
    let limits = PageLimits::default().max_items(50);
    let projects = Project::list_all(&client, &ProjectListQuery::default(), &limits).await?;
    println!(
        "Collected {} projects over {} pages (truncated: {})",
        projects.len(),
        projects.pages_fetched,
        projects.truncated
    );

    // Fetch one project twice; the second read revalidates with its ETag
    if let Some(first) = projects.items.first() {
        println!("\n--- Getting Project Details ---");
        let project = Project::get(&client, first.id).await?;
        println!("Project: {}", project.name);
        println!("  Status: {:?}", project.status);
        println!("  URL: {}", project.app_url.as_deref().unwrap_or("unknown"));

        let again = Project::get(&client, first.id).await?;
        println!("  Unchanged on re-read: {}", again == project);
        if let Some(cache) = client.cache() {
            println!("  Cached responses: {}", cache.len());
        }
    }

    println!("\nDone!");
    Ok(())
}
