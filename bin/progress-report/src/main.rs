use chrono::{Local, NaiveDate, Utc};
use clap::Parser;
use econ_progress::streak::parse_study_date;
use econ_service::{ServiceConfig, tracing::init_tracing};
use uuid::Uuid;

/// Print a learner's progress overview
#[derive(Debug, Parser)]
#[command(name = "progress-report", version)]
struct Args {
    /// Learner to report on
    learner_id: Uuid,

    /// Local study day as YYYY-MM-DD (defaults to today)
    #[arg(value_parser = parse_study_date)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration from environment variables
    let config = ServiceConfig::from_env()?;
    init_tracing(&config.env);

    let learner_id = args.learner_id;
    let today = args.date.unwrap_or_else(|| Local::now().date_naive());

    let service = econ_service::connect(&config).await?;
    let overview = service.overview(learner_id, today, Utc::now()).await?;

    println!("learner       {}", overview.learner_id);
    println!(
        "level         {} ({} XP, {} to next)",
        overview.level.level, overview.experience_points, overview.level.xp_to_next_level
    );
    println!("streak        {} days", overview.streak_days);
    println!("lessons       {}", overview.completed_lessons);
    let review = &overview.review;
    println!(
        "concepts      {} ({} due, {} weak, {} mastered)",
        overview.learned_concepts, review.due, review.weak, review.mastered
    );
    for (day, activity) in &overview.weekly_activity {
        println!("  {day}  {:>4} XP  {} lessons", activity.xp, activity.lessons);
    }
    for (achievement, earned_on) in &overview.achievements {
        println!("badge         {} ({earned_on})", achievement.as_str());
    }

    tracing::debug!(%learner_id, "Report printed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_with_date() {
        let id = Uuid::new_v4();
        let id_arg = id.to_string();
        let args = Args::try_parse_from(["progress-report", id_arg.as_str(), "2024-06-14"])
            .unwrap();
        assert_eq!(args.learner_id, id);
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 6, 14));
    }

    #[test]
    fn test_date_is_optional() {
        let id_arg = Uuid::new_v4().to_string();
        let args = Args::try_parse_from(["progress-report", id_arg.as_str()]).unwrap();
        assert_eq!(args.date, None);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let id_arg = Uuid::new_v4().to_string();
        let id = id_arg.as_str();
        assert!(Args::try_parse_from(["progress-report"]).is_err());
        assert!(Args::try_parse_from(["progress-report", "not-a-uuid"]).is_err());
        assert!(Args::try_parse_from(["progress-report", id, "14/06/2024"]).is_err());
        assert!(Args::try_parse_from(["progress-report", id, "2024-06-14", "extra"]).is_err());
    }
}
