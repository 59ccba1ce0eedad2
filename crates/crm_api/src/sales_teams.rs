use shared::{
    domain::{SalesTeam, SalesTeamId},
    error::CrmError,
    protocol::{ChangeKind, SalesTeamDraft},
};
use tracing::info;

use crate::CrmContext;

pub async fn list_sales_teams(ctx: &CrmContext) -> Result<Vec<SalesTeam>, CrmError> {
    let mut teams = ctx.sales_teams.get_all().await?;
    teams.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(teams)
}

pub async fn get_sales_team(ctx: &CrmContext, id: SalesTeamId) -> Result<SalesTeam, CrmError> {
    ctx.sales_teams
        .get_by_id(id)
        .await?
        .ok_or_else(|| CrmError::not_found("sales team", id))
}

pub async fn create_sales_team(
    ctx: &CrmContext,
    draft: SalesTeamDraft,
) -> Result<SalesTeam, CrmError> {
    if draft.name.trim().is_empty() {
        return Err(CrmError::validation("sales team name is required"));
    }
    let draft = SalesTeamDraft {
        name: draft.name.trim().to_string(),
        ..draft
    };
    let team = ctx.sales_teams.create(&draft).await?;
    ctx.record_changed::<SalesTeam>(team.id, ChangeKind::Created);
    Ok(team)
}

/// Creates any of `names` that no team carries yet (compared ignoring case)
/// and returns the full team list. Running it twice creates nothing new.
pub async fn ensure_sales_teams(
    ctx: &CrmContext,
    names: &[&str],
) -> Result<Vec<SalesTeam>, CrmError> {
    let existing = ctx.sales_teams.get_all().await?;
    let mut known: Vec<String> = existing
        .iter()
        .map(|team| team.name.to_lowercase())
        .collect();

    for name in names.iter().map(|name| name.trim()) {
        if name.is_empty() || known.contains(&name.to_lowercase()) {
            continue;
        }
        let team = create_sales_team(
            ctx,
            SalesTeamDraft {
                name: name.to_string(),
                ..SalesTeamDraft::default()
            },
        )
        .await?;
        info!(team_id = %team.id, name = %team.name, "sales team created");
        known.push(name.to_lowercase());
    }

    list_sales_teams(ctx).await
}
