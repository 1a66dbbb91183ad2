//! seismodash - earthquake monitoring and prediction from your terminal.
//!
//! Lists observed and predicted earthquakes through the saved filters,
//! colors cities for the maps, manages the account session and serves a
//! local web dashboard.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing::{error, warn};

mod cli;
mod output;

use cli::{AuthCommand, Cli, Command, FilterCommand, ProfileCommand, ReportsCommand, TableArgs};
use seismodash::auth::{
    AuthFlow, LoginForm, PasswordChangeForm, RegistrationForm, SessionStore, Verified,
};
use seismodash::colorize::{
    MapMetric, MapSelection, Viewport, find_boundary, parse_boundaries, style_regions,
};
use seismodash::dashboard::{Dashboard, Dataset, Fetched, LoadState, View};
use seismodash::filters::{FilterPatch, FilterStore};
use seismodash::models::ProfileUpdate;
use seismodash::server;
use seismodash::storage::{COOKIES_KEY, LocalStore};
use seismodash::transform::{PageNumber, SortSpec, TablePage};
use seismodash::{ApiClient, Config};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::resolve(cli.config.as_deref()).context("failed to load configuration")?;

    // Initialize tracing based on verbosity
    init_tracing(&config.logging.level, cli.verbose, cli.quiet);

    let app = App::new(config)?;
    let result = match cli.command {
        Command::Earthquakes(args) => app.cmd_earthquakes(&args),
        Command::Predictions(args) => app.cmd_predictions(&args),
        Command::Stats(args) => app.cmd_stats(&args),
        Command::Reports(cmd) => app.cmd_reports(cmd),
        Command::Map(args) => app.cmd_map(&args),
        Command::Filter(cmd) => app.cmd_filter(cmd),
        Command::Auth(cmd) => app.cmd_auth(cmd),
        Command::Profile(cmd) => app.cmd_profile(cmd),
        Command::Ui(args) => app.cmd_ui(&args),
    };

    app.save_cookies();
    result
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Everything a command needs: config, local store and a client carrying
/// the saved session cookies.
struct App {
    config: Config,
    store: LocalStore,
    client: ApiClient,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let store = LocalStore::new(&config.storage.data_dir);
        let client = ApiClient::new(&config.api).context("failed to create API client")?;

        match store.get::<String>(COOKIES_KEY) {
            Ok(Some(header)) => {
                if let Err(e) = client.import_cookies(&header) {
                    warn!("ignoring saved cookies: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("ignoring saved cookies: {}", e),
        }

        Ok(Self {
            config,
            store,
            client,
        })
    }

    /// Persist the session cookies for the next invocation.
    fn save_cookies(&self) {
        let result = match self.client.export_cookies() {
            Some(header) => self.store.set(COOKIES_KEY, &header),
            None => self.store.remove(COOKIES_KEY),
        };
        if let Err(e) = result {
            warn!("failed to save session cookies: {}", e);
        }
    }

    fn dashboard(&self, page_size: Option<usize>) -> Dashboard {
        Dashboard::new(
            FilterStore::load(self.store.clone()),
            page_size.unwrap_or(self.config.api.page_size),
        )
    }

    fn auth_flow(&self) -> AuthFlow<ApiClient> {
        AuthFlow::new(self.client.clone(), SessionStore::load(self.store.clone()))
    }

    /// Execute the `earthquakes` command.
    fn cmd_earthquakes(&self, args: &TableArgs) -> Result<()> {
        let mut dash = self.dashboard(args.page_size);
        let criteria = dash.criteria().clone();
        prepare(&mut dash.earthquakes, args);
        dash.earthquakes.refresh(&self.client, &criteria);
        print_view(&dash.earthquakes, args)
    }

    /// Execute the `predictions` command.
    fn cmd_predictions(&self, args: &cli::PredictionArgs) -> Result<()> {
        let mut dash = self.dashboard(args.table.page_size);
        let criteria = dash.criteria().clone();
        let view = &mut dash.predictions;
        prepare(view, &args.table);

        if args.most_severe {
            let (ticket, _) = view.begin(&criteria);
            // the endpoint ignores the criteria, so narrow the set here
            let result = self
                .client
                .most_severe_predictions()
                .map(|records| Fetched::Summary(criteria.retain_matching(records)));
            view.complete(ticket, result);
        } else {
            view.refresh(&self.client, &criteria);
        }
        print_view(view, &args.table)
    }

    /// Execute the `stats` command.
    fn cmd_stats(&self, args: &cli::StatsArgs) -> Result<()> {
        let stats = self
            .client
            .stats(args.resource, args.kind)
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .with_context(|| format!("failed to fetch {} statistics", args.kind.as_str()))?;

        output::write_stats(&mut io::stdout().lock(), &stats, args.format)?;
        Ok(())
    }

    /// Execute the `reports` subcommands.
    fn cmd_reports(&self, cmd: ReportsCommand) -> Result<()> {
        match cmd {
            ReportsCommand::List { format } => {
                let reports = self
                    .client
                    .list_reports()
                    .map_err(|e| anyhow::anyhow!(e.user_message()))
                    .context("failed to list reports")?;
                output::write_reports(&mut io::stdout().lock(), &reports, format)?;
            }
            ReportsCommand::Download { id, output } => {
                let report = self
                    .client
                    .download_report(&id)
                    .map_err(|e| anyhow::anyhow!(e.user_message()))
                    .with_context(|| format!("failed to download report {id}"))?;

                let path = output.unwrap_or_else(|| report.filename.clone().into());
                std::fs::write(&path, &report.content)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Saved {} ({} bytes)", path.display(), report.content.len());
            }
        }
        Ok(())
    }

    /// Execute the `map` command.
    fn cmd_map(&self, args: &cli::MapArgs) -> Result<()> {
        let mut dash = self.dashboard(None);
        let criteria = dash.criteria().clone();

        let (state, aggregates) = match args.metric {
            MapMetric::Magnitude => {
                dash.earthquakes.refresh(&self.client, &criteria);
                (failure(&dash.earthquakes), dash.earthquakes.aggregates())
            }
            MapMetric::Possibility => {
                dash.predictions.refresh(&self.client, &criteria);
                (failure(&dash.predictions), dash.predictions.aggregates())
            }
        };
        if let Some(message) = state {
            bail!(message);
        }

        let Some(path) = &args.boundaries else {
            output::write_map(&mut io::stdout().lock(), &aggregates, args.format)?;
            return Ok(());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let geojson: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid GeoJSON", path.display()))?;
        let boundaries = parse_boundaries(&geojson);
        if boundaries.is_empty() {
            bail!("no named polygons in {}", path.display());
        }

        let viewport = Viewport::turkey(args.width, args.height);
        let mut selection = MapSelection::default();
        if let Some(city) = &args.select {
            let boundary = find_boundary(&boundaries, city)
                .with_context(|| format!("no region named {city} in {}", path.display()))?;
            selection.click(boundary, &viewport);
        }

        let regions = style_regions(&aggregates, &boundaries, &viewport);
        output::write_regions(
            &mut io::stdout().lock(),
            &regions,
            selection.popup(),
            args.format,
        )?;
        Ok(())
    }

    /// Execute the `filter` subcommands.
    fn cmd_filter(&self, cmd: FilterCommand) -> Result<()> {
        let mut filters = FilterStore::load(self.store.clone());
        let format = match cmd {
            FilterCommand::Show { format } => format,
            FilterCommand::Set(args) => {
                let mut patch = FilterPatch::default();
                if let Some(city) = args.city {
                    patch = patch.city(Some(city));
                }
                if args.clear_city {
                    patch = patch.city(None);
                }
                if let Some(v) = args.min_magnitude {
                    patch = patch.min_magnitude(v);
                }
                if let Some(v) = args.max_magnitude {
                    patch = patch.max_magnitude(v);
                }
                if let Some(d) = args.start_date {
                    patch = patch.start_date(Some(d));
                }
                if let Some(d) = args.end_date {
                    patch = patch.end_date(Some(d));
                }
                if args.clear_dates {
                    patch = patch.start_date(None).end_date(None);
                }
                if patch.is_empty() {
                    bail!("nothing to change; pass at least one filter option");
                }
                filters.apply_partial(patch);
                output::Format::Human
            }
            FilterCommand::Reset => {
                filters.reset();
                output::Format::Human
            }
        };

        output::write_criteria(&mut io::stdout().lock(), filters.criteria(), format)?;
        Ok(())
    }

    /// Execute the `auth` subcommands.
    fn cmd_auth(&self, cmd: AuthCommand) -> Result<()> {
        let mut flow = self.auth_flow();
        match cmd {
            AuthCommand::Register {
                first_name,
                last_name,
                email,
                password,
                confirm_password,
                accept_terms,
            } => {
                flow.register(&RegistrationForm {
                    first_name,
                    last_name,
                    email: email.clone(),
                    password,
                    confirm_password,
                    accept_terms,
                })?;
                println!("Registered. Enter the code sent to {email} with `seismodash auth verify`.");
            }
            AuthCommand::Verify { email, code } => {
                flow.resume_verification(&email)?;
                match flow.verify(&code)? {
                    Verified::SignedIn => println!("Email verified."),
                    Verified::LoginRequired => {
                        println!("Email verified. Sign in with `seismodash auth login`.");
                    }
                }
            }
            AuthCommand::Resend { email } => {
                flow.resume_verification(&email)?;
                flow.resend_code()?;
                println!("A new code was sent to {email}.");
            }
            AuthCommand::Login { email, password } => {
                if let Some(current) = flow.session().user() {
                    bail!(
                        "already signed in as {}; run `seismodash auth logout` first",
                        current.email
                    );
                }
                let user = flow.login(&LoginForm { email, password })?;
                println!("Signed in as {}.", user.display_name());
            }
            AuthCommand::Forgot { email } => {
                flow.begin_password_reset()?;
                flow.request_password_reset(&email)?;
                println!("If {email} has an account, a reset link is on its way.");
            }
            AuthCommand::Logout => {
                flow.logout();
                println!("Signed out.");
            }
            AuthCommand::Whoami { format } => {
                output::write_session(&mut io::stdout().lock(), flow.session().user(), format)?;
            }
        }
        Ok(())
    }

    /// Execute the `profile` subcommands.
    fn cmd_profile(&self, cmd: ProfileCommand) -> Result<()> {
        let mut flow = self.auth_flow();
        match cmd {
            ProfileCommand::Update {
                first_name,
                last_name,
                email,
            } => {
                let update = ProfileUpdate {
                    first_name,
                    last_name,
                    email,
                };
                if update == ProfileUpdate::default() {
                    bail!("nothing to change; pass --first-name, --last-name or --email");
                }
                let user = flow.update_profile(&update)?;
                println!("Profile updated for {}.", user.display_name());
            }
            ProfileCommand::Password {
                current,
                new,
                confirm,
            } => {
                flow.change_password(&PasswordChangeForm {
                    current_password: current,
                    new_password: new,
                    confirm_password: confirm,
                })?;
                println!("Password changed.");
            }
        }
        Ok(())
    }

    /// Execute the `ui` command - start web server.
    fn cmd_ui(&self, args: &cli::UiArgs) -> Result<()> {
        let config = server::ServerConfig {
            port: args.port,
            host: args.host.clone(),
        };
        let state = server::AppState::new(self.client.clone(), self.dashboard(None));

        // Print startup message
        let url = format!("http://{}:{}", args.host, args.port);
        println!("\x1b[1m🌍 seismodash Web UI\x1b[0m");
        println!("\x1b[2m───────────────────────────────────────\x1b[0m");
        println!("  Local:   \x1b[96m{url}\x1b[0m");
        println!("  Backend: {}", self.client.base_url());
        println!("\x1b[2m───────────────────────────────────────\x1b[0m");
        println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

        // Open browser if requested (using xdg-open/open command)
        if args.open {
            #[cfg(target_os = "linux")]
            let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
            #[cfg(target_os = "macos")]
            let _ = std::process::Command::new("open").arg(&url).spawn();
            #[cfg(target_os = "windows")]
            let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
        }

        // Run the async server on tokio runtime
        tokio::runtime::Runtime::new()
            .context("failed to create tokio runtime")?
            .block_on(server::run_server(config, state))
    }
}

/// Apply the requested sort and page before the first fetch.
fn prepare<T: Dataset>(view: &mut View<T>, args: &TableArgs) {
    if let Some(key) = args.sort {
        view.set_sort(SortSpec::new(key, args.dir));
    }
    view.set_page(PageNumber::new(args.page));
}

fn failure<T: Dataset>(view: &View<T>) -> Option<String> {
    match view.state() {
        LoadState::Failed(message) => Some(message.clone()),
        _ => None,
    }
}

fn print_view<T: Dataset + Serialize>(view: &View<T>, args: &TableArgs) -> Result<()> {
    if let Some(message) = failure(view) {
        bail!(message);
    }

    let mut handle = io::stdout().lock();
    match view.rows() {
        Some(page) => output::write_table(&mut handle, &page, args.format)?,
        None => output::write_table(
            &mut handle,
            &TablePage::<T> {
                rows: Vec::new(),
                page: PageNumber::FIRST,
                total_pages: 0,
                total_elements: 0,
            },
            args.format,
        )?,
    }
    Ok(())
}
