//! BankDojo Jr. CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 교사로 로그인 (역할이 없으면 역할 선택 안내)
//! dojo login --as teacher
//!
//! # 역할 선택
//! dojo role set teacher
//!
//! # 보호된 경로 확인
//! dojo open /teacher-dashboard --require teacher
//!
//! # 상점
//! dojo store items
//! dojo store buy lamp-01
//!
//! # 서버 상태 감시
//! dojo health --watch
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dojo_cli::commands::{auth, health, open, quests, room, store, transactions};
use dojo_cli::{render, AppContext};
use dojo_core::{init_logging, AppConfig, LogConfig, LogFormat, Role};
use tracing::error;

#[derive(Parser)]
#[command(name = "dojo")]
#[command(about = "BankDojo Jr. - 학생/교사용 금융 교육 클라이언트", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 (기본: bankdojo.toml, 없으면 기본값)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (설정 파일보다 우선)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 역할별 로그인
    Login {
        /// 로그인할 역할 (student, teacher)
        #[arg(long = "as", value_parser = parse_role)]
        role: Role,
    },

    /// 로그아웃 (선택한 역할은 유지)
    Logout,

    /// 현재 사용자 정보
    Whoami,

    /// 역할 조회/선택
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },

    /// 경로에 대한 접근 가능 여부 확인
    Open {
        /// 경로 (예: /teacher-dashboard)
        path: String,

        /// 요구 역할
        #[arg(long, value_parser = parse_role)]
        require: Option<Role>,
    },

    /// API 서버 상태 확인
    Health {
        /// 주기적으로 계속 확인
        #[arg(long)]
        watch: bool,
    },

    /// 상점
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// 퀘스트
    Quests {
        #[command(subcommand)]
        action: QuestAction,
    },

    /// 거래 내역
    Transactions {
        /// 학생 ID (기본: 로그인한 학생)
        #[arg(long)]
        student: Option<String>,
    },

    /// 방 꾸미기
    Room {
        #[command(subcommand)]
        action: RoomAction,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// 현재 역할 표시
    Show,
    /// 역할 선택
    Set {
        #[arg(value_parser = parse_role)]
        role: Role,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// 아이템 목록
    Items,
    /// 아이템 구매
    Buy {
        item_id: String,
        #[arg(long)]
        student: Option<String>,
    },
    /// 보유 아이템
    Inventory {
        #[arg(long)]
        student: Option<String>,
    },
}

#[derive(Subcommand)]
enum QuestAction {
    /// 반의 퀘스트 목록
    List {
        /// 반 ID
        #[arg(long)]
        class: String,
    },
    /// 퀘스트 완료
    Complete {
        quest_id: String,
        #[arg(long)]
        student: Option<String>,
    },
}

#[derive(Subcommand)]
enum RoomAction {
    /// 방 배치 보기
    Show {
        #[arg(long)]
        student: Option<String>,
    },
    /// JSON 파일로 방 배치 저장
    Set { layout: PathBuf },
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse::<Role>()
        .map_err(|_| format!("Invalid role: {}. Use: student, teacher", s))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = %e, "command failed");
        eprintln!("{}", render::failure(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    let mut log_config = LogConfig::from_config(&config.logging);
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format.parse::<LogFormat>().map_err(anyhow::Error::msg)?);
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let ctx = AppContext::build(config)?;

    // 명령이 실패해도 갱신된 세션은 저장
    let outcome = dispatch(&ctx, cli.command).await;
    ctx.finish(outcome)
}

async fn dispatch(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Login { role } => auth::login(ctx, role).await?,
        Commands::Logout => auth::logout(ctx).await?,
        Commands::Whoami => auth::whoami(ctx),
        Commands::Role { action } => match action {
            RoleAction::Show => auth::show_role(ctx),
            RoleAction::Set { role } => auth::set_role(ctx, role)?,
        },
        Commands::Open { path, require } => open::open(ctx, &path, require),
        Commands::Health { watch } => {
            if watch {
                health::watch(ctx).await?
            } else {
                health::check(ctx).await?
            }
        }
        Commands::Store { action } => match action {
            StoreAction::Items => store::items(ctx).await?,
            StoreAction::Buy { item_id, student } => store::buy(ctx, &item_id, student).await?,
            StoreAction::Inventory { student } => store::inventory(ctx, student).await?,
        },
        Commands::Quests { action } => match action {
            QuestAction::List { class } => quests::list(ctx, &class).await?,
            QuestAction::Complete { quest_id, student } => {
                quests::complete(ctx, &quest_id, student).await?
            }
        },
        Commands::Transactions { student } => transactions::list(ctx, student).await?,
        Commands::Room { action } => match action {
            RoomAction::Show { student } => room::show(ctx, student).await?,
            RoomAction::Set { layout } => room::set(ctx, &layout).await?,
        },
    }
    Ok(())
}
