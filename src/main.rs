use clap::{Arg, Command};
use log::LevelFilter;
use mailguard::types::{
    IndicatorType, PolicyAction, PolicyEvaluationContext, PolicyRules, PolicyTuning,
    SecurityPolicy, TargetUsers, ThreatCategory, ThreatIndicator,
};
use mailguard::{
    aggregate_decision, AnalyzerConfig, EmailAnalysisRequest, EmailRiskAnalyzer, MemoryStore,
    PolicyEngine, PolicyStore,
};
use std::process;
use std::sync::Arc;

fn main() {
    let matches = Command::new("mailguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Email risk scoring and policy decision engine")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Analyzer configuration file path")
                .default_value("/etc/mailguard.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write the default configuration file and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Run sample emails through the full scoring and policy pipeline")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        match AnalyzerConfig::default().save_to_file(path) {
            Ok(()) => {
                println!("Default configuration written to {}", path);
                return;
            }
            Err(e) => {
                eprintln!("Failed to write configuration: {:#}", e);
                process::exit(1);
            }
        }
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/mailguard.yaml");

    let config_found = std::path::Path::new(config_path).exists();
    let config = if config_found {
        match AnalyzerConfig::load_from_file(config_path) {
            Ok(config) => {
                log::info!("loaded configuration from {}", config_path);
                config
            }
            Err(e) => {
                eprintln!("Invalid configuration {}: {:#}", config_path, e);
                process::exit(1);
            }
        }
    } else {
        log::info!("no configuration at {}, using defaults", config_path);
        AnalyzerConfig::default()
    };

    if matches.get_flag("test-config") {
        println!("{}", test_config_report(config_path, config_found));
        if !config_found {
            process::exit(1);
        }
        return;
    }

    if matches.get_flag("demo") {
        if let Err(e) = run_demo(config) {
            eprintln!("Demo failed: {:#}", e);
            process::exit(1);
        }
        return;
    }

    eprintln!("Nothing to do; try --demo, --test-config, or --generate-config");
    process::exit(2);
}

/// Report line for `--test-config`. A missing file is not a pass: the
/// flag is asked to test the named file, not the built-in defaults.
fn test_config_report(path: &str, found: bool) -> String {
    if found {
        format!("Configuration {} OK", path)
    } else {
        format!("No configuration file at {}; nothing to test", path)
    }
}

fn seed_store(store: &MemoryStore) -> anyhow::Result<()> {
    store.add_indicator(
        "acme",
        ThreatIndicator {
            indicator_type: IndicatorType::Domain,
            value: "credential-harvest.example".to_string(),
            threat_category: ThreatCategory::Phishing,
            confidence: 0.92,
            source: "osint-feed".to_string(),
            last_seen: chrono::Utc::now(),
            metadata: Default::default(),
        },
    )?;

    let policies = [
        SecurityPolicy {
            id: "pol-dlp".to_string(),
            tenant_id: "acme".to_string(),
            name: "Outbound DLP".to_string(),
            target_users: TargetUsers::All,
            rules: PolicyRules::Dlp {
                actions: vec![PolicyAction::Warn],
            },
            tuning: PolicyTuning::default(),
            is_active: true,
        },
        SecurityPolicy {
            id: "pol-phish".to_string(),
            tenant_id: "acme".to_string(),
            name: "Phishing protection".to_string(),
            target_users: TargetUsers::All,
            rules: PolicyRules::PhishingProtection,
            tuning: PolicyTuning::default(),
            is_active: true,
        },
        SecurityPolicy {
            id: "pol-exec".to_string(),
            tenant_id: "acme".to_string(),
            name: "Executive protection".to_string(),
            target_users: TargetUsers::Listed(vec!["7".to_string()]),
            rules: PolicyRules::ExecutiveProtection,
            tuning: PolicyTuning::default(),
            is_active: true,
        },
        SecurityPolicy {
            id: "pol-beh".to_string(),
            tenant_id: "acme".to_string(),
            name: "Behavioral watch".to_string(),
            target_users: TargetUsers::All,
            rules: PolicyRules::BehavioralAnalysis,
            tuning: PolicyTuning::default(),
            is_active: true,
        },
    ];
    for policy in &policies {
        store.insert_policy(policy)?;
    }
    Ok(())
}

fn sample_emails() -> Vec<EmailAnalysisRequest> {
    let mail = |from: &str, to: &str, subject: &str, body: &str, user: &str| EmailAnalysisRequest {
        from_address: from.to_string(),
        to_address: to.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        tenant_id: "acme".to_string(),
        user_id: user.to_string(),
        user_role: None,
    };

    vec![
        mail(
            "alice@acme.com",
            "bob@acme.com",
            "standup notes",
            "same time tomorrow",
            "1",
        ),
        mail(
            "alice@acme.com",
            "friend@gmail.com",
            "Quarterly confidential financials",
            "see the attached figures",
            "1",
        ),
        mail(
            "ceo@acme.com",
            "finance@acme.com",
            "Urgent: verify account now",
            "wire the funds before noon",
            "7",
        ),
        mail(
            "mallory@acme.com",
            "recruiter@competitor.com",
            "customer list",
            "large attachment with the full database export",
            "3",
        ),
        mail(
            "news@legit.com",
            "bob@acme.com",
            "weekly digest",
            "mirror hosted at credential-harvest.example",
            "1",
        ),
    ]
}

/// Run the sample traffic through analyze -> evaluate -> aggregate.
/// Collaborator failures fail open: the error is logged and the message
/// allowed, which is this caller's explicit policy choice.
fn run_demo(config: AnalyzerConfig) -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    seed_store(&store)?;

    let analyzer = EmailRiskAnalyzer::new(config, store.clone(), store.clone());
    let engine = PolicyEngine::new(store.clone(), store.clone())?;

    for request in sample_emails() {
        let analysis = match analyzer.analyze(&request) {
            Ok(analysis) => analysis,
            Err(e) => {
                log::error!(
                    "analysis failed for {} -> {}, failing open: {:#}",
                    request.from_address,
                    request.to_address,
                    e
                );
                continue;
            }
        };

        let context = PolicyEvaluationContext::from_analysis(&request, &analysis);
        let results = match engine.evaluate_all_policies(&context) {
            Ok(results) => results,
            Err(e) => {
                log::error!("policy evaluation failed, failing open: {:#}", e);
                Vec::new()
            }
        };

        let decision = aggregate_decision(&analysis, &results);
        println!(
            "{} -> {} | {}",
            request.from_address, request.to_address, decision.reasoning
        );
        for warning in &analysis.warnings {
            println!("    - {}", warning);
        }
    }

    Ok(())
}
