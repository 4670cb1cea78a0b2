use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vazhi_core::pipeline::TopicClassifierKind;

#[derive(Parser)]
#[command(name = "vazhi")]
#[command(
    about = "Vazhi - route questions to the right knowledge source and answer from what it returns"
)]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  vazhi ask \"How do transformers handle long context?\"     Routed, grounded answer
  vazhi retrieve \"Latest developments in AI regulation\"   Context only, no generation
  vazhi multilingual \"¿Quién inventó la imprenta?\"         Answer from the matching Wikipedia edition

\x1b[1;36mMore Pipelines:\x1b[0m
  vazhi digest \"AI regulation\"                            News + background summary
  vazhi fact-check \"Python was created in 1989\"           True / False / Unknown verdict
  vazhi papers \"diffusion models\" -n 5                    Bullet summaries of arXiv papers

\x1b[1;36mConfiguration:\x1b[0m
  vazhi bindings                                          Which backend serves which category
  vazhi config init                                       Write the default config file
  OPENAI_API_KEY, OPENAI_BASE_URL, TAVILY_API_KEY         Read from the environment")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file (defaults to ~/.config/vazhi/config.yaml)
    #[arg(long, global = true, env = "VAZHI_CONFIG")]
    pub config: Option<PathBuf>,

    /// How topic queries are classified
    #[arg(long, global = true, value_enum, default_value_t = ClassifierArg::Llm)]
    pub classifier: ClassifierArg,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a query by topic, retrieve from the bound source and answer
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  vazhi ask \"What is retrieval-augmented generation?\"
  vazhi ask \"Latest developments in AI regulation\" --output json
  vazhi ask \"attention mechanisms\" --classifier keywords")]
    Ask {
        /// The question to answer
        query: String,
    },

    /// Route and retrieve without generating an answer
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  vazhi retrieve \"graph neural networks\"
  vazhi retrieve \"election results\" --classifier keywords --output yaml")]
    Retrieve {
        /// The query to route
        query: String,
    },

    /// Detect the query language and answer from that Wikipedia edition
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  vazhi multilingual \"Wer hat die Relativitätstheorie entwickelt?\"
  vazhi multilingual \"東京の人口は?\"")]
    Multilingual {
        /// The question, in any supported language
        query: String,
    },

    /// Summarise recent news and background for a topic
    Digest {
        /// Topic to summarise
        topic: String,
    },

    /// Check a statement against encyclopedic context
    FactCheck {
        /// Statement to verify
        statement: String,
    },

    /// Summarise the top arXiv papers for a query
    Papers {
        /// Search query
        query: String,

        /// Number of papers (overrides `paper_count` from the config)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Show which backend serves each topic and language
    Bindings,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ClassifierArg {
    /// Ask the generative backend for the topic
    Llm,
    /// Keyword heuristics, no backend call
    Keywords,
}

impl From<ClassifierArg> for TopicClassifierKind {
    fn from(arg: ClassifierArg) -> Self {
        match arg {
            ClassifierArg::Llm => TopicClassifierKind::Llm,
            ClassifierArg::Keywords => TopicClassifierKind::Keywords,
        }
    }
}
