use std::path::Path;

use anyhow::{Context, Result, bail};
use chirp::{
    Composer, IdentityProvider, PostItem, ProfileView, Route, SubmitOutcome, Timeline,
    auth::{CreateAccountForm, LoginForm, log_out},
    backend::memory::{MemoryBlobStore, MemoryDocumentStore, MemoryIdentityProvider},
    delete_post,
    model::PhotoFile,
    resolve,
};

use super::load_config;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Scripted Session",
    commands: &[
        "chirp tour                    # Walk through sign-up, posting, editing, and deleting",
        "chirp tour --name kim         # Use a different display name",
        "chirp --output json tour      # Print every feed snapshot as JSON",
    ],
}];

const TOUR_EMAIL: &str = "tour@chirp.local";
const TOUR_PASSWORD: &str = "chirp-tour";

/// Runs a whole session against the in-memory collaborators.
pub async fn handle_tour(path: Option<&Path>, name: &str, output: &OutputManager) -> Result<()> {
    let config = load_config(path)?;
    let settings = &config.chirp;
    let identities = MemoryIdentityProvider::new();
    let docs = MemoryDocumentStore::new();
    let blobs = MemoryBlobStore::new(config.storage.download_base_url.clone());

    output.heading("Chirp Tour");

    output.step("Creating an account");
    let signup = CreateAccountForm::new();
    signup.set_name(name);
    signup.set_email(TOUR_EMAIL);
    signup.set_password(TOUR_PASSWORD);
    if signup.submit(&identities).await.is_none() {
        bail!("account creation failed: {}", signup.error());
    }
    for email in identities.outbox() {
        output.bullet(&format!("{:?} email sent to {}", email.kind, email.to));
    }

    let identity = identities.current_identity().await;
    let route = resolve(Route::Home.path(), identity.as_ref());
    output.info(&format!("Opening / renders {route} until the address is verified"));
    identities.mark_email_verified(TOUR_EMAIL);

    output.step("Logging out and back in");
    log_out(&identities, |_| true).await;
    let login = LoginForm::new();
    login.set_email(TOUR_EMAIL);
    login.set_password(TOUR_PASSWORD);
    let Some(route) = login.submit(&identities).await else {
        bail!("login failed: {}", login.error());
    };
    let identity = identities.current_identity().await.context("no identity after login")?;
    output.success(&format!("Signed in, landing on {}", resolve(route.path(), Some(&identity))));

    let mut timeline = Timeline::mount(&docs, &settings.limits(), &settings.collection).await?;
    timeline.drain();
    output.feed("Timeline", timeline.posts())?;

    output.step("Posting");
    let composer = Composer::new(settings);
    composer.set_text("hello");
    expect_done(composer.submit(Some(&identity), &docs, &blobs).await, output)?;

    composer.set_text("a post with a photo");
    if let Err(err) = composer.attach(PhotoFile::new("huge.png", "image/png", vec![0; 2 * 1024 * 1024])) {
        output.warning(err.first_message().unwrap_or("attachment refused"));
    }
    composer.attach(PhotoFile::new("small.png", "image/png", vec![0; 512]))?;
    expect_done(composer.submit(Some(&identity), &docs, &blobs).await, output)?;
    timeline.drain();
    output.feed("Timeline", timeline.posts())?;

    output.step("Editing the oldest post");
    let oldest = timeline.posts().last().cloned().context("timeline is empty")?;
    let mut item = PostItem::new(oldest, Some(&identity), settings);
    item.toggle_edit();
    if let Some(editor) = item.editor() {
        editor.set_text("hello, edited");
    }
    if let Some(outcome) = item.submit_edit(Some(&identity), &docs, &blobs).await {
        expect_done(outcome, output)?;
    }
    timeline.drain();
    output.feed("Timeline", timeline.posts())?;

    output.step("Deleting the post with the photo");
    let with_photo = timeline
        .posts()
        .iter()
        .find(|post| post.photo.is_some())
        .cloned()
        .context("no post with a photo")?;
    let outcome = delete_post(&with_photo, Some(&identity), |_| true, &settings.collection, &docs, &blobs).await;
    output.info(&format!("Delete finished: {outcome:?}, {} blob(s) left", blobs.len()));
    timeline.drain();
    output.feed("Timeline", timeline.posts())?;

    output.step("Renaming on the profile page");
    let profile = ProfileView::load(&identity, &docs, settings).await?;
    profile.toggle_name_editor();
    profile.name_editor().set_draft("chirper");
    profile.save_name(Some(&identity), &identities).await?;
    output.key_value("Name", &profile.name());
    output.feed("Profile", profile.posts())?;
    output.info("Existing posts keep the name they were written with");

    timeline.unmount();
    output.success(&format!("Tour finished, {} live subscription(s) left", docs.live_subscriptions()));
    Ok(())
}

fn expect_done(outcome: SubmitOutcome, output: &OutputManager) -> Result<()> {
    match outcome {
        SubmitOutcome::Done(id) => {
            output.success(&format!("Saved {id}"));
            Ok(())
        }
        other => bail!("submission did not complete: {other:?}"),
    }
}
