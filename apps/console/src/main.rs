use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client_core::{config::load_settings, ApiClient, FileSessionStore, ProductsApi, ProductsService, SessionStore};
use shared::{protocol::ProductQuery, validate::validate_login};

/// Back-office console: log in and print a page of the product catalog.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    validate_login(&args.email, &args.password)?;

    let settings = load_settings();
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&settings.session_dir));
    let client = ApiClient::from_settings(&settings, store)?;

    let session = client.login(&args.email, &args.password).await?;
    println!(
        "Logged in as {} {} <{}>",
        session.user.first_name, session.user.last_name, session.user.email
    );

    let products = ProductsService::new(client.clone());
    let mut query = ProductQuery::default().with_page(args.page);
    if let Some(search) = args.search {
        query = query.with_search(search);
    }

    let page = products.list(&query).await?;
    println!(
        "{} products, page {}/{}",
        page.total, page.page, page.total_pages
    );
    for product in &page.products {
        println!(
            "{:>4}  {:<30} {:>10.2}  {:<14} stock={}",
            product.id, product.name, product.price, product.category, product.stock
        );
    }

    Ok(())
}
