use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use aethercode_assist::{
    AssistFeed, AssistService, CancellationToken, CompletionRequest, DiagnosisRequest,
    GeminiBackend, GeminiConfig,
};
use aethercode_project::{
    FileId, FileNode, JsonProjectStore, Language, TabAction, Workbench,
};
use aethercode_settings::preferences::STATE_DIR;
use aethercode_settings::{Preferences, PreferencesStore};
use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const PROJECT_FILE: &str = "project.json";

#[derive(Parser)]
#[command(
    name = "aethercode",
    about = "Command-line front end for AetherCode projects",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 提高記錄詳細程度（可重複）。 / Increase log verbosity (repeatable).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 將示範專案寫入工作區。 / Write the demo project into the workspace.
    Init(InitArgs),
    /// 列出專案樹。 / Print the project tree.
    Tree(TreeArgs),
    /// 建立新檔案並儲存專案。 / Create a file and save the project.
    NewFile(NewFileArgs),
    /// 重播分頁動作腳本並輸出工作階段。 / Replay a tab-action script and print the session.
    Replay(ReplayArgs),
    /// 取得 AI 程式碼補全。 / Ask the model for a code completion.
    Suggest(SuggestArgs),
    /// 執行 AI 錯誤診斷。 / Ask the model to diagnose a file.
    Diagnose(DiagnoseArgs),
    /// 檢視或修改偏好設定。 / Inspect or change preferences.
    #[command(subcommand)]
    Preferences(PreferencesCommand),
}

#[derive(Args)]
struct InitArgs {
    /// 覆寫既有專案檔。 / Overwrite an existing project file.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct TreeArgs {
    /// 依名稱篩選（不分大小寫）。 / Case-insensitive name filter.
    #[arg(long, value_name = "QUERY")]
    filter: Option<String>,
}

#[derive(Args)]
struct NewFileArgs {
    /// 新檔案名稱。 / Name of the new file.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// 父資料夾識別碼；略過則建立於根層級。 / Parent folder id; root level when omitted.
    #[arg(long, value_name = "ID")]
    parent: Option<String>,
    /// 檔案語言；預設取自偏好設定。 / File language; defaults to the preference.
    #[arg(long, value_name = "LANG")]
    language: Option<LanguageChoice>,
}

#[derive(Args)]
struct ReplayArgs {
    /// 內含 JSON 動作陣列的腳本檔。 / Script file holding a JSON array of tab actions.
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,
}

#[derive(Args)]
struct SuggestArgs {
    /// 目標檔案識別碼。 / Target file id.
    #[arg(long = "file", value_name = "ID")]
    file: String,
    /// 游標所在的程式碼片段；預設為最後一個非空白行。 / Code at the cursor; defaults to the last non-blank line.
    #[arg(long, value_name = "TEXT")]
    cursor: Option<String>,
}

#[derive(Args)]
struct DiagnoseArgs {
    /// 目標檔案識別碼。 / Target file id.
    #[arg(long = "file", value_name = "ID")]
    file: String,
}

#[derive(Subcommand)]
enum PreferencesCommand {
    /// 顯示目前偏好設定。 / Show the effective preferences.
    Show,
    /// 修改單一偏好設定。 / Change one preference.
    Set(PreferencesSetArgs),
    /// 還原為預設值。 / Restore the defaults.
    Reset,
}

#[derive(Args)]
struct PreferencesSetArgs {
    /// 設定鍵，例如 `assist.model`。 / Preference key, e.g. `assist.model`.
    #[arg(value_name = "KEY")]
    key: PreferenceKey,
    /// 新的值。 / New value.
    #[arg(value_name = "VALUE")]
    value: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PreferenceKey {
    #[value(name = "assist.endpoint")]
    AssistEndpoint,
    #[value(name = "assist.model")]
    AssistModel,
    #[value(name = "assist.api_key_env")]
    AssistApiKeyEnv,
    #[value(name = "assist.timeout_secs")]
    AssistTimeoutSecs,
    #[value(name = "editor.default_language")]
    EditorDefaultLanguage,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LanguageChoice {
    #[value(alias = "ts")]
    Typescript,
    #[value(alias = "js")]
    Javascript,
    Html,
    Css,
    #[value(alias = "py")]
    Python,
    Json,
    #[value(alias = "md")]
    Markdown,
    #[value(alias = "text")]
    Plaintext,
}

impl From<LanguageChoice> for Language {
    fn from(choice: LanguageChoice) -> Self {
        match choice {
            LanguageChoice::Typescript => Language::TypeScript,
            LanguageChoice::Javascript => Language::JavaScript,
            LanguageChoice::Html => Language::Html,
            LanguageChoice::Css => Language::Css,
            LanguageChoice::Python => Language::Python,
            LanguageChoice::Json => Language::Json,
            LanguageChoice::Markdown => Language::Markdown,
            LanguageChoice::Plaintext => Language::PlainText,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);
    let workspace_root = resolve_workspace(workspace)?;
    debug!(workspace = %workspace_root.display(), "resolved workspace");

    match command {
        Commands::Init(args) => execute_init(args, &workspace_root),
        Commands::Tree(args) => execute_tree(args, &workspace_root),
        Commands::NewFile(args) => execute_new_file(args, &workspace_root),
        Commands::Replay(args) => execute_replay(args, &workspace_root),
        Commands::Suggest(args) => execute_suggest(args, &workspace_root),
        Commands::Diagnose(args) => execute_diagnose(args, &workspace_root),
        Commands::Preferences(subcommand) => {
            execute_preferences_command(subcommand, &workspace_root)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn execute_init(args: InitArgs, workspace_root: &Path) -> Result<()> {
    let path = project_path(workspace_root);
    if path.exists() && !args.force {
        bail!(
            "project file '{}' already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tree = aethercode_project::demo::project();
    JsonProjectStore::new(&path)
        .save(&tree)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "initialised demo project");
    println!("Initialised project '{}' at {}", tree.name, path.display());
    Ok(())
}

fn execute_tree(args: TreeArgs, workspace_root: &Path) -> Result<()> {
    let workbench = open_workbench(workspace_root)?;
    let tree = workbench.tree();
    let nodes = match args.filter.as_deref() {
        Some(query) => tree.filter_by_name(query),
        None => tree.files.clone(),
    };
    println!("{} (revision {})", tree.name, tree.revision);
    print_nodes(&nodes, "");
    Ok(())
}

fn print_nodes(nodes: &[FileNode], prefix: &str) {
    for node in nodes {
        let path = format!("{prefix}/{}", node.name);
        let kind = match node.language() {
            Some(language) => language.as_str(),
            None => "folder",
        };
        println!("{}\t{}\t{}", node.id, kind, path);
        print_nodes(node.children(), &path);
    }
}

fn execute_new_file(args: NewFileArgs, workspace_root: &Path) -> Result<()> {
    let preferences = load_preferences(workspace_root)?;
    let language = args
        .language
        .map(Language::from)
        .unwrap_or(preferences.editor.default_language);
    let parent = args.parent.map(FileId::from);

    let mut workbench = open_workbench(workspace_root)?;
    let id = workbench
        .new_file(parent.as_ref(), &args.name, language)
        .with_context(|| format!("failed to create '{}'", args.name))?;
    let path = workbench
        .tree()
        .path_of(&id)
        .ok_or_else(|| anyhow!("created file '{id}' is missing from the project"))?;
    println!("Created {id} at {path}");
    Ok(())
}

fn execute_replay(args: ReplayArgs, workspace_root: &Path) -> Result<()> {
    let script = resolve_input_path(&args.script)?;
    let contents = fs::read_to_string(&script)
        .with_context(|| format!("failed to read {}", script.display()))?;
    let actions: Vec<TabAction> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", script.display()))?;

    let mut workbench = open_workbench(workspace_root)?;
    for (step, action) in actions.into_iter().enumerate() {
        if !workbench.apply(action) {
            debug!(step, "action left the session unchanged");
        }
    }
    println!("{}", serde_json::to_string_pretty(workbench.session())?);
    Ok(())
}

fn execute_suggest(args: SuggestArgs, workspace_root: &Path) -> Result<()> {
    let workbench = open_workbench(workspace_root)?;
    let file_id = FileId::from(args.file);
    let (content, language) = file_for_assist(&workbench, &file_id)?;
    let cursor_context = args
        .cursor
        .unwrap_or_else(|| last_non_blank_line(&content).to_string());
    let request = CompletionRequest {
        file_content: content,
        cursor_context,
        language,
    };

    let service = assist_service(workspace_root)?;
    let runtime = build_runtime()?;
    let routed = runtime.block_on(async {
        let cancel = cancel_on_ctrl_c();
        service.suggest_for(file_id, request, &cancel).await
    });

    let mut feed = AssistFeed::new();
    if !feed.record_routed_suggestion(routed.clone()) {
        warn!("suggestion request failed");
    }
    let output = json!({
        "response": routed,
        "suggestions": feed.suggestions(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn execute_diagnose(args: DiagnoseArgs, workspace_root: &Path) -> Result<()> {
    let workbench = open_workbench(workspace_root)?;
    let file_id = FileId::from(args.file);
    let (code, language) = file_for_assist(&workbench, &file_id)?;
    let request = DiagnosisRequest { code, language };

    let service = assist_service(workspace_root)?;
    let runtime = build_runtime()?;
    let mut feed = AssistFeed::new();
    feed.begin_diagnosis();
    let routed = runtime.block_on(async {
        let cancel = cancel_on_ctrl_c();
        service.diagnose_for(file_id, request, &cancel).await
    });

    if !feed.record_routed_diagnosis(routed.clone()) {
        warn!("diagnosis request failed");
    }
    let output = json!({
        "response": routed,
        "diagnosis": feed.diagnosis(),
        "suggestions": feed.suggestions(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn execute_preferences_command(command: PreferencesCommand, workspace_root: &Path) -> Result<()> {
    match command {
        PreferencesCommand::Show => {
            let preferences = load_preferences(workspace_root)?;
            println!("{}", serde_json::to_string_pretty(&preferences)?);
            Ok(())
        }
        PreferencesCommand::Set(args) => set_preference(args, workspace_root),
        PreferencesCommand::Reset => {
            let mut store = open_preferences(workspace_root)?;
            store
                .overwrite(Preferences::default())
                .with_context(|| format!("failed to write {}", store.path().display()))?;
            println!("Reset preferences at {}", store.path().display());
            Ok(())
        }
    }
}

fn set_preference(args: PreferencesSetArgs, workspace_root: &Path) -> Result<()> {
    let PreferencesSetArgs { key, value } = args;
    let timeout_secs = match key {
        PreferenceKey::AssistTimeoutSecs => Some(
            value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("'{value}' is not a number of seconds"))?,
        ),
        _ => None,
    };

    let mut store = open_preferences(workspace_root)?;
    store
        .update(|prefs| match key {
            PreferenceKey::AssistEndpoint => prefs.assist.endpoint = value.clone(),
            PreferenceKey::AssistModel => prefs.assist.model = value.clone(),
            PreferenceKey::AssistApiKeyEnv => prefs.assist.api_key_env = value.clone(),
            PreferenceKey::AssistTimeoutSecs => {
                if let Some(secs) = timeout_secs {
                    prefs.assist.timeout_secs = secs;
                }
            }
            PreferenceKey::EditorDefaultLanguage => {
                prefs.editor.default_language = Language::from_name(&value)
            }
        })
        .with_context(|| format!("failed to write {}", store.path().display()))?;
    println!("{}", serde_json::to_string_pretty(store.preferences())?);
    Ok(())
}

fn file_for_assist(workbench: &Workbench, id: &FileId) -> Result<(String, Language)> {
    let node = workbench
        .find(id)
        .ok_or_else(|| anyhow!("file '{id}' does not exist"))?;
    match (node.content(), node.language()) {
        (Some(content), Some(language)) => Ok((content.to_string(), language)),
        _ => bail!("'{id}' is a folder"),
    }
}

fn last_non_blank_line(content: &str) -> &str {
    content
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default()
}

fn assist_service(workspace_root: &Path) -> Result<AssistService> {
    let preferences = load_preferences(workspace_root)?;
    let assist = preferences.assist;
    let api_key = env::var(&assist.api_key_env).ok();
    if api_key.is_none() {
        warn!(variable = %assist.api_key_env, "API key variable is not set");
    }
    let backend = GeminiBackend::new(GeminiConfig {
        endpoint: assist.endpoint,
        model: assist.model,
        api_key,
        api_key_env: assist.api_key_env,
    });
    Ok(AssistService::new(Arc::new(backend))
        .with_timeout(Duration::from_secs(assist.timeout_secs)))
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

// Must be called inside the runtime.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

fn open_workbench(workspace_root: &Path) -> Result<Workbench> {
    let path = project_path(workspace_root);
    Workbench::load(Box::new(JsonProjectStore::new(&path)))
        .with_context(|| format!("failed to load project from {}", path.display()))
}

fn open_preferences(workspace_root: &Path) -> Result<PreferencesStore> {
    let path = PreferencesStore::workspace_path(workspace_root);
    PreferencesStore::load(&path)
        .with_context(|| format!("failed to load preferences from {}", path.display()))
}

fn load_preferences(workspace_root: &Path) -> Result<Preferences> {
    Ok(open_preferences(workspace_root)?.preferences().clone())
}

fn project_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(STATE_DIR).join(PROJECT_FILE)
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => resolve_input_path(&path),
        None => env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
