use clap::Args;
use release_gate::bugs::{BugAction, BugPriority, BugSeverity, NewBug};
use release_gate::config::{ConfidenceConfig, ExplainerKind};
use release_gate::error::AppError;
use release_gate::memory::MemoryStore;
use release_gate::releases::{
    ExplanationProvider, GateEvaluation, NewRelease, ReleaseAction, RuleBasedExplainer,
};
use release_gate::requirements::{NewRequirement, RequirementStatus};
use release_gate::tenant::TenantId;
use release_gate::test_runs::{NewTestRun, TestOutcome, TestResultInput, TestRunAction};

use crate::infra::Services;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Tenant the demo data is seeded under
    #[arg(long, default_value = "demo-tenant", value_parser = parse_tenant)]
    pub(crate) tenant: TenantId,
    /// Security & ops pillar value reported by the demo scanner (0-100)
    #[arg(long, default_value_t = 92.0)]
    pub(crate) security_ops_score: f64,
    /// Manual override recorded when evaluating the release gates
    #[arg(long)]
    pub(crate) override_reason: Option<String>,
}

fn parse_tenant(raw: &str) -> Result<TenantId, String> {
    TenantId::new(raw).ok_or_else(|| "tenant must not be blank".to_string())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        tenant,
        security_ops_score,
        override_reason,
    } = args;

    let store = MemoryStore::new();
    let services = Services::in_memory(
        &store,
        &ConfidenceConfig {
            explainer: ExplainerKind::Disabled,
            security_ops_score: security_ops_score.clamp(0.0, 100.0),
        },
    );

    println!("Release gate demo for tenant {tenant}");
    seed_requirements(&services, &tenant)?;
    let blocker = seed_bugs(&services, &tenant)?;
    seed_test_run(&services, &tenant)?;

    let release = services.releases.create_release(
        &tenant,
        NewRelease {
            version: "3.8.0".to_string(),
            name: Some("Autumn release train".to_string()),
            target_date: None,
        },
    )?;
    for action in [ReleaseAction::Activate, ReleaseAction::Freeze] {
        services
            .releases
            .transition_release(&tenant, release.id(), action)?;
    }
    println!("- Release {} ({}) frozen", release.version(), release.id());

    let evaluation =
        services
            .releases
            .evaluate_gates(&tenant, release.id(), override_reason.clone())?;
    render_evaluation("Before fixing the blocker", &evaluation).await;

    services
        .bugs
        .apply(&tenant, &blocker, BugAction::Start, None)?;
    services
        .bugs
        .apply(&tenant, &blocker, BugAction::Resolve, None)?;
    println!("\n- Resolved blocking bug {blocker}");

    let evaluation = services
        .releases
        .evaluate_gates(&tenant, release.id(), override_reason)?;
    render_evaluation("After fixing the blocker", &evaluation).await;

    println!("\nDomain events recorded: {}", store.events(&tenant).len());
    Ok(())
}

fn seed_requirements(services: &Services, tenant: &TenantId) -> Result<(), AppError> {
    let backlog = [
        ("Single sign-on via OIDC", RequirementStatus::Ready),
        ("Invoice PDF export", RequirementStatus::Ready),
        ("Usage-based billing", RequirementStatus::Ready),
        ("Audit trail retention policy", RequirementStatus::Ready),
        ("Dark mode", RequirementStatus::InReview),
    ];
    for (title, status) in backlog {
        services.requirements.register(
            tenant,
            NewRequirement {
                title: title.to_string(),
                status,
            },
        )?;
    }
    println!("- Registered {} requirements", backlog.len());
    Ok(())
}

fn seed_bugs(
    services: &Services,
    tenant: &TenantId,
) -> Result<release_gate::bugs::BugId, AppError> {
    let blocker = services.bugs.create(
        tenant,
        NewBug {
            title: "Refunds double-charge on retry".to_string(),
            description: "Idempotency key ignored by the payment adapter".to_string(),
            tags: vec!["payments".to_string()],
            ..NewBug::default()
        },
    )?;
    services.bugs.triage(
        tenant,
        blocker.id(),
        BugSeverity::Critical,
        BugPriority::P0,
        "payments-oncall",
    )?;

    let cosmetic = services.bugs.create(
        tenant,
        NewBug {
            title: "Tooltip clipped on narrow screens".to_string(),
            description: "Settings page tooltip overflows at 320px".to_string(),
            ..NewBug::default()
        },
    )?;
    services
        .bugs
        .triage(tenant, cosmetic.id(), BugSeverity::Low, BugPriority::P3, "web-team")?;

    println!("- Filed 2 bugs (1 critical)");
    Ok(blocker.id().clone())
}

fn seed_test_run(services: &Services, tenant: &TenantId) -> Result<(), AppError> {
    let run = services.test_runs.create(
        tenant,
        NewTestRun {
            name: "Release candidate regression".to_string(),
            expected_test_count: 40,
        },
    )?;
    services
        .test_runs
        .apply(tenant, run.id(), TestRunAction::Start)?;
    for index in 0..40 {
        let outcome = match index {
            3 | 17 => TestOutcome::Failed,
            29 => TestOutcome::Skipped,
            _ => TestOutcome::Passed,
        };
        services.test_runs.record_result(
            tenant,
            run.id(),
            TestResultInput {
                test_case_id: format!("RC-{index:03}"),
                outcome,
                duration_ms: 180,
                error_message: (outcome == TestOutcome::Failed)
                    .then(|| "assertion failed".to_string()),
            },
        )?;
    }
    let run = services
        .test_runs
        .apply(tenant, run.id(), TestRunAction::Complete)?;
    println!(
        "- Completed test run {} at {}% ({})",
        run.id(),
        run.pass_rate(),
        run.pass_rate_status().label()
    );
    Ok(())
}

async fn render_evaluation(heading: &str, evaluation: &GateEvaluation) {
    let rcs = &evaluation.rcs;
    let breakdown = &rcs.breakdown;
    println!("\n{heading}");
    println!(
        "  Release confidence {}/100 (QT {:.0} | B {:.0} | RP {:.0} | SO {:.0})",
        rcs.display_score,
        breakdown.quality_testing,
        breakdown.bugs,
        breakdown.requirements_planning,
        breakdown.security_ops
    );
    for gate in &evaluation.gates {
        println!(
            "  [{}] {}{}: {}",
            if gate.passed { "pass" } else { "FAIL" },
            gate.name,
            if gate.required { "" } else { " (optional)" },
            gate.message
        );
    }
    if let Some(reason) = evaluation
        .override_reason
        .as_deref()
        .filter(|_| evaluation.overridden())
    {
        println!("  Override applied: {reason}");
    }
    println!(
        "  Decision: {}",
        if evaluation.can_release {
            "ready to release"
        } else {
            "blocked"
        }
    );

    match RuleBasedExplainer.explain_rcs(rcs.score, breakdown).await {
        Ok(explanation) => {
            println!("  {}", explanation.summary);
            for risk in &explanation.risks {
                println!("    risk: {risk}");
            }
            for strength in &explanation.strengths {
                println!("    strength: {strength}");
            }
        }
        Err(err) => println!("  Explanation unavailable: {err}"),
    }
}
