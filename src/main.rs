use std::{
    io::{self, BufRead, Write},
    process,
    sync::Arc,
    thread,
    time::Duration,
};

use claplog::{
    application::{
        admin::{AdminEditor, Confirm, EditorForm, Screen},
        debounce::Debouncer,
        error::AppError,
        list::{CardClick, ListAction, ListStatus, ListView},
        overlay::{ApplaudOutcome, Burst, CountSource, DetailOverlay, OverlaySurface, OverlayView},
        repos::PostStore,
    },
    config::{
        self, AdminArgs, AdminCommand, ApplaudArgs, ListArgs, PostFieldArgs, ShowArgs, UiSettings,
    },
    domain::entities::{PostId, PostRecord},
    infra::{
        backend::{self, Backend},
        telemetry,
    },
    presentation::{admin as admin_views, text, views},
};
use tokio::{
    sync::{mpsc, watch},
    time::timeout,
};
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const OPEN_WAIT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
    } else {
        let subscriber = tracing_fmt()
            .with_writer(io::stderr)
            .with_max_level(Level::ERROR)
            .finish();
        let dispatch = Dispatch::new(subscriber);
        dispatcher::with_default(&dispatch, || {
            error!(error = %error, "application error");
        });
    }
    eprintln!("{}", error.user_message());
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    let backend = backend::connect(&settings.backend, &settings.demo)?;
    let stagger = settings.ui.stagger_step;

    match cli_args.command {
        config::Command::List(args) => run_list(&backend, stagger, args).await,
        config::Command::Browse => run_browse(&backend, &settings.ui).await,
        config::Command::Show(args) => run_show(&backend, stagger, args).await,
        config::Command::Applaud(args) => run_applaud(&backend, stagger, args).await,
        config::Command::Admin(args) => run_admin(backend, args).await,
    }
}

async fn run_list(backend: &Backend, stagger: Duration, args: ListArgs) -> Result<(), AppError> {
    let mut list = ListView::load(backend.store.as_ref(), stagger).await;
    if let Some(tag) = args.tag.as_deref() {
        list.toggle_tag(tag);
    }
    if let Some(search) = args.search.as_deref() {
        list.set_search(search);
        list.refilter();
    }

    let model = list.render();
    if args.html {
        println!("{}", views::render_post_grid(&model)?);
    } else {
        println!("{}", text::post_list(&model));
    }

    match list.status() {
        ListStatus::Failed { message } => Err(AppError::Transient(
            model.failure_detail.unwrap_or_else(|| message.clone()),
        )),
        _ => Ok(()),
    }
}

enum BrowseInput {
    Quit,
    Tag(String),
    Search(String),
}

impl BrowseInput {
    /// `#tag` toggles a tag, `:q` quits, anything else is search text.
    fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line == ":q" {
            return Self::Quit;
        }
        match line.strip_prefix('#') {
            Some(tag) if !tag.trim().is_empty() => Self::Tag(tag.trim().to_string()),
            _ => Self::Search(line.to_string()),
        }
    }
}

async fn run_browse(backend: &Backend, ui: &UiSettings) -> Result<(), AppError> {
    let mut list = ListView::load(backend.store.as_ref(), ui.stagger_step).await;
    println!("{}", text::post_list(&list.render()));

    let (settled_tx, mut settled_rx) = mpsc::unbounded_channel::<()>();
    let debouncer = Debouncer::spawn(ui.search_debounce, move |()| {
        let _ = settled_tx.send(());
    });
    let mut lines = spawn_stdin_reader();
    let mut search_pending = false;

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                let line =
                    line.map_err(|err| AppError::unexpected(format!("failed to read input: {err}")))?;
                match BrowseInput::parse(&line) {
                    BrowseInput::Quit => break,
                    BrowseInput::Tag(tag) => {
                        let transitions = list.toggle_tag(&tag);
                        search_pending = false;
                        debug!(tag = %tag, transitions = transitions.len(), "tag toggled");
                        println!("{}", text::post_list(&list.render()));
                    }
                    BrowseInput::Search(query) => {
                        list.set_search(&query);
                        search_pending = true;
                        debouncer.push(());
                    }
                }
            }
            Some(()) = settled_rx.recv() => {
                if search_pending {
                    let transitions = list.refilter();
                    search_pending = false;
                    debug!(transitions = transitions.len(), "search settled");
                    println!("{}", text::post_list(&list.render()));
                }
            }
        }
    }

    // Input closed mid-debounce: apply what was typed last.
    if search_pending {
        list.refilter();
        println!("{}", text::post_list(&list.render()));
    }
    Ok(())
}

/// Read stdin lines on a plain thread; tokio's stdin would hold up runtime
/// shutdown until the next line arrives.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (sender, receiver) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let failed = line.is_err();
            if sender.send(line).is_err() || failed {
                break;
            }
        }
    });
    receiver
}

async fn run_show(backend: &Backend, stagger: Duration, args: ShowArgs) -> Result<(), AppError> {
    let post = snapshot_post(backend.store.as_ref(), stagger, &args.id).await?;
    let overlay = DetailOverlay::new(Arc::clone(&backend.store), Arc::new(TerminalSurface));
    overlay.open(&post);

    let mut views_rx = overlay.watch();
    let view = wait_for_view(&mut views_rx, OPEN_WAIT, OverlayView::is_confirmed)
        .await
        .or_else(|| overlay.current());

    if let Some(view) = view.as_ref() {
        if args.html {
            println!("{}", views::render_overlay(view, None)?);
        } else {
            println!("{}", text::overlay(view));
        }
    }

    if args.watch {
        follow_counts(&mut views_rx, view.map(|view| view.claps)).await;
    }

    overlay.close().await;
    Ok(())
}

/// Print every count change until interrupted or the post disappears.
async fn follow_counts(views_rx: &mut watch::Receiver<Option<OverlayView>>, mut last: Option<u64>) {
    loop {
        tokio::select! {
            changed = views_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let claps = views_rx.borrow_and_update().as_ref().map(|view| view.claps);
                match claps {
                    Some(claps) if Some(claps) != last => {
                        println!("{claps} Claps");
                        last = Some(claps);
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
}

async fn run_applaud(
    backend: &Backend,
    stagger: Duration,
    args: ApplaudArgs,
) -> Result<(), AppError> {
    let post = snapshot_post(backend.store.as_ref(), stagger, &args.id).await?;
    let overlay = DetailOverlay::new(Arc::clone(&backend.store), Arc::new(TerminalSurface));
    overlay.open(&post);

    let limit = Duration::from_secs(args.wait_seconds);
    let mut views_rx = overlay.watch();
    let baseline = wait_for_view(&mut views_rx, limit, OverlayView::is_confirmed)
        .await
        .map_or(post.claps, |view| view.claps);

    if let ApplaudOutcome::Failed(err) = overlay.applaud().await {
        overlay.close().await;
        return Err(err);
    }

    let target = baseline + 1;
    let delivered = wait_for_view(&mut views_rx, limit, |view| {
        view.source == CountSource::Live && view.claps >= target
    })
    .await;
    match delivered {
        Some(view) => println!("{}", text::claps_line(&view)),
        None => {
            warn!(post_id = %post.id, "applause not confirmed before the wait elapsed");
            println!("Applause sent; the new count has not arrived yet.");
        }
    }

    overlay.close().await;
    Ok(())
}

async fn run_admin(backend: Backend, args: AdminArgs) -> Result<(), AppError> {
    let skip_prompt = matches!(args.command, AdminCommand::Delete { yes: true, .. });
    let confirm: Arc<dyn Confirm> =
        Arc::new(move |prompt: &str| skip_prompt || prompt_stdin(prompt));
    let mut editor = AdminEditor::start(backend.store, backend.auth, confirm).await;

    if matches!(editor.screen(), Screen::Login(_)) {
        let credentials = &args.credentials;
        if let Some(provider) = credentials.provider.as_deref() {
            let url = editor.sign_in_with_provider(provider).await?;
            println!("{url}");
            eprintln!("Finish signing in with --redirect-fragment <FRAGMENT>.");
            return Ok(());
        }

        if let Some(fragment) = credentials.redirect_fragment.as_deref() {
            editor.complete_provider_sign_in(fragment).await?;
        } else {
            let (Some(email), Some(password)) =
                (credentials.email.as_deref(), credentials.password.as_deref())
            else {
                return Err(AppError::Auth(
                    "email and password are required for admin commands".to_string(),
                ));
            };
            editor.sign_in(email, password).await?;
        }
    }

    let result = run_admin_command(&mut editor, args.command).await;

    if let Err(err) = editor.sign_out().await {
        warn!(error = %err, "sign-out failed");
    }
    result
}

async fn run_admin_command(editor: &mut AdminEditor, command: AdminCommand) -> Result<(), AppError> {
    match command {
        AdminCommand::Posts { html } => {
            let model = editor.render();
            if html {
                println!("{}", admin_views::render_admin(&model)?);
            } else {
                println!("{}", text::admin(&model));
            }
        }
        AdminCommand::Create(fields) => {
            editor.new_post();
            if let Some(form) = editor.editor_mut() {
                apply_field_args(form, fields);
            }
            editor.save().await?;
            info!("post published");
            println!("{}", text::admin(&editor.render()));
        }
        AdminCommand::Update { id, fields } => {
            if !editor.edit(&PostId::new(id)) {
                return Err(AppError::NotFound);
            }
            if let Some(form) = editor.editor_mut() {
                apply_field_args(form, fields);
            }
            editor.save().await?;
            info!("post updated");
            println!("{}", text::admin(&editor.render()));
        }
        AdminCommand::Delete { id, .. } => {
            if editor.delete(&PostId::new(id)).await? {
                println!("{}", text::admin(&editor.render()));
            } else {
                println!("Delete cancelled.");
            }
        }
    }
    Ok(())
}

fn apply_field_args(form: &mut EditorForm, fields: PostFieldArgs) {
    if let Some(title) = fields.title {
        form.title = title;
    }
    if let Some(content) = fields.content {
        form.content = content;
    }
    if let Some(tags) = fields.tags {
        form.tags = tags;
    }
    if let Some(image) = fields.image {
        form.image = image;
    }
}

/// Resolve a post through the list snapshot, the way a card click does.
async fn snapshot_post(
    store: &dyn PostStore,
    stagger: Duration,
    id: &str,
) -> Result<PostRecord, AppError> {
    let mut list = ListView::load(store, stagger).await;
    if let ListStatus::Failed { message } = list.status() {
        let detail = list.render().failure_detail.unwrap_or_else(|| message.clone());
        return Err(AppError::Transient(detail));
    }
    match list.click(&PostId::new(id), CardClick::Body) {
        ListAction::Open(post) => Ok(post),
        _ => Err(AppError::NotFound),
    }
}

async fn wait_for_view(
    views_rx: &mut watch::Receiver<Option<OverlayView>>,
    limit: Duration,
    ready: impl Fn(&OverlayView) -> bool,
) -> Option<OverlayView> {
    let waited = timeout(
        limit,
        views_rx.wait_for(|view| view.as_ref().is_some_and(|view| ready(view))),
    )
    .await;
    match waited {
        Ok(Ok(view)) => (*view).clone(),
        _ => None,
    }
}

fn prompt_stdin(prompt: &str) -> bool {
    eprint!("{prompt} [y/N] ");
    if io::stderr().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

struct TerminalSurface;

impl OverlaySurface for TerminalSurface {
    fn burst(&self, burst: &Burst) {
        debug!(
            particles = burst.particles.len(),
            duration_ms = burst.duration.as_millis() as u64,
            "applause burst"
        );
        eprintln!("\u{1F44F}");
    }

    fn set_scroll_locked(&self, locked: bool) {
        debug!(locked, "scroll lock");
    }
}
