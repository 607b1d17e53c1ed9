//! Demo CLI for the CLB core.
//!
//! Runs the codelist engine against in-memory repositories: seed a small
//! workspace, import codelists from a JSON file, print the resulting tree.
//! Useful for exploring the domain behaviour without a persistence layer or
//! API in front of it.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use clb_core::memory::{InMemoryCodes, InMemoryOntologies};
use clb_core::repo::{
    CodelistRepository, CollectionRepository, OntologyRepository, PhenotypeRepository,
    UserRepository,
};
use clb_core::services::{
    ChangesetInput, CodelistInput, CodelistService, CodesetInput, CommitChangesRequest,
    CommitInput, CreateCodelistRequest, CreateCollectionRequest, ImportCodelistsRequest,
    ReferencePosition, WorkspaceService,
};
use clb_core::{
    Code, Codelist, Container, ContainerSpec, ItemId, ItemType, Ontology, Session, User, Workspace,
};
use clb_ids::{UserId, WorkspaceId};

#[derive(Parser)]
#[command(name = "clb")]
#[command(about = "CLB codelist builder demo CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a demo workspace and print it
    Tree,
    /// Import codelists from a JSON file into a demo collection
    Import {
        /// Path to a JSON file: {"filename": "...", "codelists": [...]}
        path: String,
    },
    /// List the built-in demo ontology catalogue
    Ontologies,
}

/// On-disk shape of an import file.
#[derive(Deserialize)]
struct ImportFile {
    filename: String,
    codelists: Vec<ImportFileCodelist>,
}

#[derive(Deserialize)]
struct ImportFileCodelist {
    name: String,
    codesets: Vec<ImportFileCodeset>,
}

#[derive(Deserialize)]
struct ImportFileCodeset {
    ontology_id: String,
    codes: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Tree) => {
            let (mut session, user) = demo_session();
            seed_demo_workspace(&mut session, &user)?;
            print_workspace(&session, user.id);
        }
        Some(Commands::Import { path }) => {
            let contents = std::fs::read_to_string(&path)?;
            let file: ImportFile = serde_json::from_str(&contents)?;

            let (mut session, user) = demo_session();
            let collection = WorkspaceService::new(&mut session, user.clone())
                .create_collection(CreateCollectionRequest {
                    name: "Imported".into(),
                    item_type: ItemType::Codelist,
                    description: None,
                    reference_id: None,
                })?;

            let response = CodelistService::new(&mut session, user.clone()).import(
                ImportCodelistsRequest {
                    container: ContainerSpec::Collection(collection.id()),
                    filename: file.filename,
                    codelists: file
                        .codelists
                        .into_iter()
                        .map(|cl| CodelistInput {
                            name: cl.name,
                            codesets: cl
                                .codesets
                                .into_iter()
                                .map(|cs| CodesetInput {
                                    ontology_id: cs.ontology_id,
                                    codes: cs.codes,
                                })
                                .collect(),
                        })
                        .collect(),
                },
            )?;

            println!(
                "imported: {} fully, {} partially, {} skipped",
                response.stats.fully, response.stats.partially, response.stats.skipped
            );
            for report in &response.reports {
                println!("--- {}", report.codelist_name);
                if report.skipped {
                    println!("skipped: no valid codes");
                } else {
                    println!("{}", report.report);
                }
            }
            println!();
            print_workspace(&session, user.id);
        }
        Some(Commands::Ontologies) => {
            let (session, _) = demo_session();
            for ontology in session.ontologies.get_all() {
                println!("{}", ontology.id);
            }
        }
        None => {
            println!("try `clb tree`, `clb import <file>` or `clb ontologies`");
        }
    }

    Ok(())
}

/// A session over in-memory repositories with a small built-in ontology
/// catalogue and one user.
fn demo_session() -> (Session, User) {
    let mut session = Session::in_memory();

    let mut ontologies = InMemoryOntologies::default();
    let mut codes = InMemoryCodes::default();
    let catalogue: &[(&str, &[(i64, &str, &str)])] = &[
        (
            "ICD-10-CM",
            &[
                (1, "I20.0", "Unstable angina"),
                (2, "I21.0", "STEMI of anterior wall"),
                (3, "I21.1", "STEMI of inferior wall"),
                (4, "I25.1", "Atherosclerotic heart disease"),
                (5, "I50.9", "Heart failure, unspecified"),
            ],
        ),
        (
            "ICD-9-CM",
            &[
                (100, "410", "Acute myocardial infarction"),
                (101, "411", "Other acute ischemic heart disease"),
                (102, "428", "Heart failure"),
            ],
        ),
    ];
    for (ontology_id, ontology_codes) in catalogue {
        ontologies.register(Ontology {
            id: ontology_id.to_string(),
            root_code_ids: ontology_codes.iter().map(|(id, _, _)| *id).collect(),
        });
        for (id, code, description) in *ontology_codes {
            codes.register(Code {
                id: *id,
                code: code.to_string(),
                ontology_id: ontology_id.to_string(),
                description: description.to_string(),
                path: vec![*id],
                children_ids: vec![],
                last_descendant_id: *id,
            });
        }
    }
    session.ontologies = Box::new(ontologies);
    session.codes = Box::new(codes);

    let user = User {
        id: UserId::random(),
        external_id: "demo".into(),
        name: "Demo User".into(),
        workspace: Workspace::new(WorkspaceId::random()),
    };
    session.users.save(user.clone());

    (session, user)
}

/// Builds a small workspace: one collection, two codelists with a bit of
/// commit history.
fn seed_demo_workspace(
    session: &mut Session,
    user: &User,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = WorkspaceService::new(session, user.clone()).create_collection(
        CreateCollectionRequest {
            name: "Cardiology".into(),
            item_type: ItemType::Codelist,
            description: Some("Demo collection".into()),
            reference_id: None,
        },
    )?;

    let mut codelists = CodelistService::new(session, user.clone());
    let angina = codelists.create(CreateCodelistRequest {
        name: "Angina".into(),
        description: None,
        position: ReferencePosition {
            container: Some(ContainerSpec::Collection(collection.id())),
            item_id: None,
        },
        reference_id: None,
    })?;
    codelists.commit_changes(CommitChangesRequest {
        codelist_id: angina.id(),
        commit: CommitInput {
            message: "initial picks".into(),
            changes: vec![ChangesetInput {
                ontology_id: "ICD-10-CM".into(),
                added: vec![1, 2],
                removed: vec![],
            }],
        },
    })?;
    codelists.commit_changes(CommitChangesRequest {
        codelist_id: angina.id(),
        commit: CommitInput {
            message: "swap anterior for inferior".into(),
            changes: vec![ChangesetInput {
                ontology_id: "ICD-10-CM".into(),
                added: vec![3],
                removed: vec![2],
            }],
        },
    })?;

    let heart_failure = codelists.create(CreateCodelistRequest {
        name: "Heart failure".into(),
        description: None,
        position: ReferencePosition {
            container: Some(ContainerSpec::Collection(collection.id())),
            item_id: Some(ItemId::Codelist(angina.id())),
        },
        reference_id: None,
    })?;
    codelists.commit_changes(CommitChangesRequest {
        codelist_id: heart_failure.id(),
        commit: CommitInput {
            message: "initial picks".into(),
            changes: vec![
                ChangesetInput {
                    ontology_id: "ICD-10-CM".into(),
                    added: vec![5],
                    removed: vec![],
                },
                ChangesetInput {
                    ontology_id: "ICD-9-CM".into(),
                    added: vec![102],
                    removed: vec![],
                },
            ],
        },
    })?;

    Ok(())
}

/// Prints the user's workspace tree with per-codelist versions and sizes.
fn print_workspace(session: &Session, user_id: UserId) {
    let Some(user) = session.users.get(user_id) else {
        println!("no such user");
        return;
    };

    for collection_id in user.workspace.collection_ids() {
        let Some(collection) = session.collections.get(*collection_id) else {
            continue;
        };
        println!(
            "{} (items: {}{})",
            collection.name,
            collection.items().len(),
            if collection.locked { ", locked" } else { "" }
        );
        for item in collection.items().ids() {
            match item {
                ItemId::Codelist(id) => {
                    if let Some(codelist) = session.codelists.get(*id) {
                        print_codelist(&codelist, 1);
                    }
                }
                ItemId::Phenotype(id) => {
                    if let Some(phenotype) = session.phenotypes.get(*id) {
                        println!("  {} (phenotype)", phenotype.name);
                        for codelist_id in phenotype.codelist_ids() {
                            if let Some(codelist) = session.codelists.get(codelist_id) {
                                print_codelist(&codelist, 2);
                            }
                        }
                    }
                }
            }
        }
    }
}

fn print_codelist(codelist: &Codelist, depth: usize) {
    let indent = "  ".repeat(depth);
    let codes: usize = codelist
        .codesets()
        .iter()
        .map(|cs| cs.number_of_codes())
        .sum();
    println!(
        "{indent}{} (v{}, {} codes)",
        codelist.name,
        codelist.version(),
        codes
    );
}
