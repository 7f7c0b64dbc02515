use colored::*;

pub const TOTAL_WIDTH: usize = 64;

pub fn header(msg: &str) {
    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    println!(
        "{}{}{}",
        "─".repeat(left).bright_black(),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right).bright_black()
    );
}

pub fn up_line(id: &str, detail: &str) {
    println!("{} {} {}", "[+]".green().bold(), id.bold(), detail);
}

pub fn down_line(id: &str, detail: &str) {
    println!("{} {} {}", "[-]".red().bold(), id.bold(), detail);
}

pub fn end_of_program() {
    println!("{}", "═".repeat(TOTAL_WIDTH).bright_black());
}
