// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    )
}

fn period_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("month")
            .long("month")
            .value_parser(value_parser!(u32))
            .requires("year")
            .help("Month 1-12, together with --year (default: current month)"),
    )
    .arg(
        Arg::new("year")
            .long("year")
            .value_parser(value_parser!(i32))
            .help("Year (default: current year)"),
    )
}

fn name_arg() -> Arg {
    Arg::new("name").long("name").required(true)
}

pub fn build_cli() -> Command {
    Command::new("pocketledger")
        .about("Personal finance ledger: accounts, categories, transactions and period reports")
        .version(clap::crate_version!())
        .subcommand_required(false)
        .subcommand(Command::new("init").about("Create the database if needed"))
        .subcommand(
            Command::new("user")
                .about("Users and the active session")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("email").long("email").required(true)),
                )
                .subcommand(
                    Command::new("login")
                        .arg(Arg::new("email").long("email").required(true)),
                )
                .subcommand(Command::new("logout"))
                .subcommand(Command::new("whoami")),
        )
        .subcommand(
            Command::new("account-type")
                .about("Groups accounts are listed under")
                .subcommand(Command::new("add").arg(name_arg()))
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("rename")
                        .arg(name_arg())
                        .arg(Arg::new("to").long("to").required(true)),
                )
                .subcommand(
                    Command::new("reorder").arg(
                        Arg::new("names")
                            .long("names")
                            .required(true)
                            .value_delimiter(',')
                            .help("Comma-separated account type names in display order"),
                    ),
                )
                .subcommand(Command::new("rm").arg(name_arg())),
        )
        .subcommand(
            Command::new("account")
                .about("Accounts and their balances")
                .subcommand(
                    Command::new("add")
                        .arg(name_arg())
                        .arg(Arg::new("type").long("type").required(true))
                        .arg(Arg::new("description").long("description")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("edit")
                        .arg(name_arg())
                        .arg(Arg::new("rename").long("rename"))
                        .arg(Arg::new("type").long("type"))
                        .arg(Arg::new("description").long("description")),
                )
                .subcommand(Command::new("rm").arg(name_arg()))
                .subcommand(json_flags(period_args(
                    Command::new("show")
                        .about("Transactions of one account for a month")
                        .arg(name_arg()),
                ))),
        )
        .subcommand(
            Command::new("category")
                .about("Income and expense categories")
                .subcommand(
                    Command::new("add").arg(name_arg()).arg(
                        Arg::new("kind")
                            .long("kind")
                            .required(true)
                            .help("income | expense"),
                    ),
                )
                .subcommand(Command::new("list").arg(Arg::new("kind").long("kind")))
                .subcommand(
                    Command::new("rename")
                        .arg(name_arg())
                        .arg(Arg::new("to").long("to").required(true)),
                )
                .subcommand(Command::new("rm").arg(name_arg())),
        )
        .subcommand(
            Command::new("tx")
                .about("Record, edit and remove transactions")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("date").long("date").help("YYYY-MM-DD (default: today)"))
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .required(true)
                                .allow_hyphen_values(true),
                        )
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .help("income | expense (default: the category's kind)"),
                        )
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .allow_hyphen_values(true),
                        )
                        .arg(Arg::new("kind").long("kind"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(json_flags(period_args(
                    Command::new("list")
                        .arg(Arg::new("account").long("account"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                ))),
        )
        .subcommand(
            Command::new("report")
                .about("Period reports")
                .subcommand(json_flags(period_args(
                    Command::new("detailed")
                        .about("Transactions of a month grouped by day")
                        .arg(Arg::new("account").long("account")),
                )))
                .subcommand(json_flags(period_args(
                    Command::new("weekly").about("Income and expense per week of a month"),
                )))
                .subcommand(json_flags(
                    Command::new("monthly")
                        .about("Income and expense per month of a year")
                        .arg(
                            Arg::new("year")
                                .long("year")
                                .value_parser(value_parser!(i32)),
                        ),
                ))
                .subcommand(json_flags(
                    Command::new("calendar")
                        .about("One entry per transaction between two dates")
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                )),
        )
        .subcommand(
            Command::new("export")
                .about("Write transactions to a file")
                .subcommand(period_args(
                    Command::new("transactions")
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .help("csv | json"),
                        )
                        .arg(Arg::new("out").long("out").required(true))
                        .arg(
                            Arg::new("all")
                                .long("all")
                                .action(ArgAction::SetTrue)
                                .conflicts_with_all(["month", "year"])
                                .help("Export every transaction"),
                        ),
                )),
        )
        .subcommand(Command::new("doctor").about("Check account balances against transactions"))
}
