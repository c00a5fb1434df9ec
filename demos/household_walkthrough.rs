use paycheck_budget_engine::*;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

fn month(key: &str) -> MonthKey {
    key.parse().expect("valid month key")
}

fn build_household() -> HouseholdDocument {
    let mut config = HouseholdConfig::new(
        vec!["Alice".to_string(), "Bob".to_string()],
        month("2024-01"),
    );
    config.shared_pool = SharedPool::enabled("Shared");
    config.starting_balances.insert("Alice".to_string(), dec!(400));
    config.starting_balances.insert("Bob".to_string(), dec!(150));

    let mut alice_income = OwnerIncome::new(dec!(2100), dec!(2100));
    alice_income.extra = dec!(80);

    let january = MonthRecord::new(vec![
        Bill::new("rent", dec!(1650), "Shared")
            .with_name("Rent")
            .with_category("housing")
            .with_due_day(1),
        Bill::new("groceries", dec!(640), "Shared")
            .with_category("food")
            .with_due_day(20),
        Bill::new("internet", dec!(75), "Shared")
            .with_category("utilities")
            .with_due_day(12),
        Bill::new("car", dec!(385.40), "Alice")
            .with_category("transport")
            .with_due_day(8),
        Bill::new("phone", dec!(62), "Alice")
            .with_category("utilities")
            .with_due_day(22),
        Bill::new("student-loan", dec!(290), "Bob")
            .with_category("debt")
            .with_due_day(17),
        Bill::new("gym", dec!(45), "Bob")
            .with_category("health")
            .paid(),
    ])
    .with_income("Alice", alice_income)
    .with_income("Bob", OwnerIncome::new(dec!(1600), dec!(1750)));

    HouseholdDocument::new(config).with_month(month("2024-01"), january)
}

fn print_columns(record: &MonthRecord, scope: &str) {
    for period in [PayPeriod::Pay1, PayPeriod::Pay2] {
        let names: Vec<String> = record
            .bills_for(scope)
            .filter(|b| b.column == period)
            .map(|b| format!("{} ({})", b.id, b.amount))
            .collect();
        println!("    {:?}: {}", period, names.join(", "));
    }
}

fn main() -> Result<()> {
    println!("💵 Paycheck Budget Walkthrough\n");

    let doc = build_household();
    let budget = HouseholdBudget::new(&doc)?;
    let january = month("2024-01");

    println!("⚖️  Balancing January across both paychecks...\n");
    let balanced = budget.balance_month(january, AssignmentStrategy::WaterLevel);
    for scope in ["Shared", "Alice", "Bob"] {
        println!("  {}:", scope);
        print_columns(&balanced, scope);
    }

    let doc = doc.clone().with_month(january, balanced);
    let budget = HouseholdBudget::new(&doc)?;

    println!("\n📊 January stats:");
    for (owner, stats) in budget.household_stats(january) {
        println!(
            "  {:<6} due {:>8} / {:>8}  free {:>8} / {:>8}  rollover {:>8}  total {:>9}",
            owner, stats.due1, stats.due2, stats.free1, stats.free2, stats.rollover, stats.total_free
        );
    }

    println!("\n🔒 Closing January with confirmed bank balances...");
    let mut confirmed: BTreeMap<String, _> = budget.proposed_closing_balances(january);
    if let Some(alice) = confirmed.get_mut("Alice") {
        *alice -= dec!(42.15);
    }
    let closed = budget.apply_edits(
        january,
        &MonthEdits::new(vec![MonthEdit::Close {
            balances: confirmed,
        }]),
    )?;
    let doc = doc.clone().with_month(january, closed);
    let budget = HouseholdBudget::new(&doc)?;

    for (owner, variance) in budget.closing_variance(january) {
        println!("  {}: variance {}", owner, variance);
    }

    let march = month("2024-03");
    println!("\n🔄 Rollover into March (February was never created):");
    for owner in &doc.config.owners {
        let walk = budget.rollover(march, owner);
        println!("  {}: {} ({:?})", owner, walk.amount, walk.stop);
    }

    println!("\n🧾 January reports:");
    let flow = budget.cash_flow(january, &ReportScope::All);
    println!(
        "  Cash flow: income {}, costs {}, net {}",
        flow.income, flow.costs, flow.net
    );
    for entry in budget.burden(january) {
        println!("  Burden {}: fixed {}, free {}", entry.owner, entry.fixed, entry.free);
    }
    for category in budget.category_breakdown(january, &ReportScope::All) {
        println!(
            "  {:<10} {:>8}  {:.1}%",
            category.category,
            category.total,
            category.share * dec!(100)
        );
    }

    println!("\n📅 February running balance:");
    let february = month("2024-02");
    let forecast = ForecastBuilder::new(&doc);
    if let Some(low) = forecast.low_point(february) {
        println!("  Lowest point: day {} at {}", low.day, low.balance);
    }

    println!("\n🎯 Paying into a savings goal:");
    let doc = doc
        .clone()
        .with_goal(SavingsGoal::new("trip", "Shared", dec!(2400)).with_name("Summer Trip"));
    let doc = doc.with_month(
        february,
        MonthRecord::new(vec![Bill::new("trip-feb", dec!(300), "Shared")
            .with_category("savings")
            .for_goal("trip")]),
    );
    let budget = HouseholdBudget::new(&doc)?;
    let outcome = budget.apply_edits_with_goals(
        february,
        &MonthEdits::new(vec![MonthEdit::TogglePaid {
            bill_id: "trip-feb".to_string(),
        }]),
    )?;
    for goal in &outcome.goals {
        println!(
            "  {}: {} of {} ({}%)",
            goal.name,
            goal.total_paid,
            goal.target,
            goal.progress_percent()
        );
    }

    println!("\n✅ Document round-trips as JSON:");
    let json = doc.to_json_string()?;
    let reloaded = HouseholdDocument::from_json_str(&json)?;
    println!("  {} bytes, identical: {}", json.len(), reloaded == doc);

    Ok(())
}
