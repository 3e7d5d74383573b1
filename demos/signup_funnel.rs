//! Signup Funnel: Bot-Safe Split Test End to End
//!
//! This example walks three visitors through a signup experiment:
//! - a crawler that never runs the confirmation trigger
//! - a human who confirms on the first page and signs up
//! - a returning user who browses anonymously, then signs in
//!
//! Only confirmed visitors reach the store, and the funnel report at the end
//! shows each variant's conversion.
//!
//! Run with: cargo run --example signup_funnel

use splitdb::logging::init_tracing;
use splitdb::model::IdentityId;
use splitdb::session::MemorySessionStore;
use splitdb::visit::{begin_visit, confirm_visit, end_visit, VisitRequest};
use splitdb::{SplitConfig, SplitStore};

const VARIANTS: [&str; 2] = ["green_button", "orange_button"];

fn request(path: &str) -> VisitRequest {
    VisitRequest::new("shop.example.com")
        .referrer("https://search.example.org/?q=shop")
        .remote_addr("203.0.113.9")
        .path(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let store = SplitStore::new();
    let sessions = MemorySessionStore::new();
    let config = SplitConfig::builder().first_visit_goal("landed").build();

    println!("=== splitdb: Signup Funnel Demo ===\n");

    // Visitor 1: crawler. Gets a variant, never confirms.
    println!("=== Visitor 1: crawler ===");
    let mut visit = begin_visit(&sessions, "crawler", &store, &config, request("/")).await?;
    let variant = visit.declare_and_enroll("signup_cta", VARIANTS)?;
    visit.log_goal("viewed_landing", None);
    let outcome = end_visit(&sessions, "crawler", visit).await?;
    println!("  Shown variant: {variant}");
    println!("  Confirmation trigger: {:?}", outcome.confirm_path());
    println!("  Subjects in store: {}\n", store.subject_count());

    // Visitor 2: human, confirms and signs up across two pages.
    println!("=== Visitor 2: new human ===");
    let mut visit = begin_visit(&sessions, "alice", &store, &config, request("/")).await?;
    let variant = visit.declare_and_enroll("signup_cta", VARIANTS)?;
    visit.log_goal("viewed_landing", None);
    end_visit(&sessions, "alice", visit).await?;
    confirm_visit(&sessions, "alice", &store, &config, request("/split/confirm_human/")).await?;

    let mut visit = begin_visit(&sessions, "alice", &store, &config, request("/signup")).await?;
    visit.log_goal("signed_up", Some("plan=basic"));
    let outcome = end_visit(&sessions, "alice", visit).await?;
    println!("  Shown variant: {variant}");
    println!("  Confirmation trigger on second page: {:?}", outcome.confirm_path());
    println!("  Subjects in store: {}\n", store.subject_count());

    // Visitor 3: browses anonymously, then signs in to an existing account.
    println!("=== Visitor 3: returning user ===");
    let identity = IdentityId::new("bob@example.com");
    let registered = store.record_identity_goal(&identity, "viewed_landing")?;
    store.enroll_as_variant("signup_cta", registered.subject(), VARIANTS[1])?;

    let mut visit = begin_visit(&sessions, "bob", &store, &config, request("/")).await?;
    visit.declare_and_enroll("signup_cta", VARIANTS)?;
    visit.log_goal("viewed_landing", None);
    end_visit(&sessions, "bob", visit).await?;
    confirm_visit(&sessions, "bob", &store, &config, request("/split/confirm_human/")).await?;

    let mut visit = begin_visit(&sessions, "bob", &store, &config, request("/login")).await?;
    visit.authenticate(identity.clone());
    visit.log_goal("signed_up", None);
    end_visit(&sessions, "bob", visit).await?;
    let subject = store
        .subject_for_identity(&identity)
        .ok_or_else(|| anyhow::anyhow!("identity was not linked"))?;
    println!("  Linked subject: {subject}");
    println!(
        "  Sticky variant after sign-in: {:?}",
        store.enrollment("signup_cta", subject.id()).map(|e| e.variant().to_string())
    );
    println!("  Subjects in store: {}\n", store.subject_count());

    // Report
    println!("=== Funnel Report ===");
    let report = store.add_report("signup_cta", "Landing to signup", "viewed_landing\nsigned_up")?;
    let funnel = store.generate(&report)?;
    for row in funnel.rows() {
        let label = row.goal().unwrap_or("enrolled");
        print!("  {label:<16}");
        for cell in row.cells() {
            let percent = cell.percent().unwrap_or_else(|| "-".to_string());
            print!(
                "  {}: {} ({percent}%, cumulative {}%)",
                cell.variant(),
                cell.count(),
                cell.cumulative_percent()
            );
        }
        println!();
    }

    println!("\n=== Activity: {} / signed_up ===", VARIANTS[1]);
    let activity = store.activity_log(
        "signup_cta",
        VARIANTS[1],
        "signed_up",
        config.activity_log_limit(),
    )?;
    for entry in &activity {
        println!("  {} {entry:?}", entry.created_at().format("%H:%M:%S%.3f"));
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
