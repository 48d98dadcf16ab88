mod common;

use anyhow::Result;
use common::TestApp;
use doc_registry::commands;
use doc_registry::constants::{DocumentStatus, UserRole};
use doc_registry::crud::Direction;
use doc_registry::documents::RelationshipSet;
use doc_registry::models::CreateDocument;
use doc_registry::query::{DocumentFilters, Pagination, Scope, Sort, SortField};

fn finance_filter() -> DocumentFilters {
    DocumentFilters {
        department: Some("Finance".into()),
        ..Default::default()
    }
}

#[test]
fn finance_listing_pages_by_two() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;
    for i in 1..=5 {
        app.create_document(&format!("FIN-{i:03}"), "Finance")?;
    }
    for i in 1..=3 {
        app.create_document(&format!("HR-{i:03}"), "People")?;
    }

    let page = commands::list_documents(
        &app.state,
        &admin,
        &finance_filter(),
        Pagination::new(1, 2),
        Sort::default(),
    )?;
    assert_eq!(page.documents.len(), 2);
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.total_pages, 3);
    assert!(page.pagination.has_next);
    assert!(!page.pagination.has_prev);
    assert!(page.documents.iter().all(|d| d.department == "Finance"));
    Ok(())
}

#[test]
fn page_sizes_follow_the_pagination_invariant() -> Result<()> {
    let app = TestApp::new()?;
    for i in 0..7 {
        app.create_document(&format!("OPS-{i}"), "Ops")?;
    }
    let total = 7_i64;

    for limit in 1..=8_i64 {
        for page in 1..=9_i64 {
            let result = app.state.query.list(
                &Scope::All,
                &DocumentFilters::default(),
                Pagination::new(page, limit),
                Sort::default(),
            )?;
            let expected = limit.min((total - (page - 1) * limit).max(0));
            assert_eq!(result.documents.len() as i64, expected, "page {page} limit {limit}");
            assert_eq!(result.pagination.total_pages, (total + limit - 1) / limit);
            assert_eq!(result.pagination.has_next, page < result.pagination.total_pages);
        }
    }
    Ok(())
}

#[test]
fn pages_do_not_overlap_and_cover_everything() -> Result<()> {
    let app = TestApp::new()?;
    for i in 0..5 {
        app.create_document(&format!("PG-{i}"), "Ops")?;
    }
    let mut seen = Vec::new();
    for page in 1..=3 {
        let result = app.state.query.list(
            &Scope::All,
            &DocumentFilters::default(),
            Pagination::new(page, 2),
            Sort {
                field: SortField::DocumentCode,
                direction: Direction::Asc,
            },
        )?;
        seen.extend(result.documents.into_iter().map(|d| d.document_code));
    }
    assert_eq!(seen, vec!["PG-0", "PG-1", "PG-2", "PG-3", "PG-4"]);
    Ok(())
}

#[test]
fn free_text_search_is_case_insensitive_and_literal() -> Result<()> {
    let app = TestApp::new()?;
    let mut travel = CreateDocument::new("FIN-T", "Travel Expenses", "Policy", "Finance");
    travel.description = Some("Covers 100% of economy fares".into());
    app.create_document_with(travel, RelationshipSet::default())?;
    app.create_document_with(
        CreateDocument::new("QA-CAL", "Calibration", "SOP", "Quality"),
        RelationshipSet::default(),
    )?;

    let search = |text: &str| -> Result<Vec<String>> {
        let page = app.state.query.list(
            &Scope::All,
            &DocumentFilters {
                search: Some(text.into()),
                ..Default::default()
            },
            Pagination::default(),
            Sort::default(),
        )?;
        Ok(page.documents.into_iter().map(|d| d.document_code).collect())
    };

    assert_eq!(search("travel")?, vec!["FIN-T"]);
    assert_eq!(search("qa-cal")?, vec!["QA-CAL"]);
    assert_eq!(search("100%")?, vec!["FIN-T"]);
    assert!(search("%")?.len() == 1);
    assert!(search("nothing like this")?.is_empty());
    Ok(())
}

#[test]
fn search_folds_non_ascii_case() -> Result<()> {
    let app = TestApp::new()?;
    app.create_document_with(
        CreateDocument::new("MED-1", "Ärzte Leitfaden", "Guide", "Medical"),
        RelationshipSet::default(),
    )?;
    app.create_document_with(
        CreateDocument::new("MED-2", "Pflegeplan", "Guide", "Medical"),
        RelationshipSet::default(),
    )?;

    for text in ["ärzte", "ÄRZTE", "LEITFADEN", "med-1"] {
        let page = app.state.query.list(
            &Scope::All,
            &DocumentFilters {
                search: Some(text.into()),
                ..Default::default()
            },
            Pagination::default(),
            Sort::default(),
        )?;
        let codes: Vec<String> = page.documents.into_iter().map(|d| d.document_code).collect();
        assert_eq!(codes, vec!["MED-1"], "search {text}");
    }
    Ok(())
}

#[test]
fn relationship_filters_do_not_duplicate_rows() -> Result<()> {
    let app = TestApp::new()?;
    let creator = app.insert_user("Cleo Creator", UserRole::DocumentCreator)?;
    let other = app.insert_user("Otto Other", UserRole::DocumentCreator)?;
    let owner = app.insert_user("Owen Owner", UserRole::DocumentOwner)?;

    app.create_document_with(
        CreateDocument::new("REL-1", "Shared", "SOP", "Ops"),
        RelationshipSet {
            creators: Some(vec![creator.id.clone(), other.id.clone()]),
            owners: Some(vec![owner.id.clone()]),
            ..Default::default()
        },
    )?;
    app.create_document_with(
        CreateDocument::new("REL-2", "Solo", "SOP", "Ops"),
        RelationshipSet {
            creators: Some(vec![other.id.clone()]),
            ..Default::default()
        },
    )?;

    let created = app.state.query.list(
        &Scope::All,
        &DocumentFilters {
            created_by_user_id: Some(creator.id.clone()),
            ..Default::default()
        },
        Pagination::default(),
        Sort::default(),
    )?;
    assert_eq!(created.pagination.total, 1);
    assert_eq!(created.documents[0].document_code, "REL-1");

    let by_other = app.state.query.list(
        &Scope::All,
        &DocumentFilters {
            created_by_user_id: Some(other.id.clone()),
            ..Default::default()
        },
        Pagination::default(),
        Sort::default(),
    )?;
    assert_eq!(by_other.pagination.total, 2);

    let owned = app.state.query.list(
        &Scope::All,
        &DocumentFilters {
            owned_by_user_id: Some(owner.id.clone()),
            ..Default::default()
        },
        Pagination::default(),
        Sort::default(),
    )?;
    assert_eq!(owned.pagination.total, 1);
    Ok(())
}

#[test]
fn owner_role_only_sees_owned_documents() -> Result<()> {
    let app = TestApp::new()?;
    let owner = app.insert_user("Olga Owner", UserRole::DocumentOwner)?;
    let controller = app.insert_user("Carl Controller", UserRole::DocumentController)?;

    app.create_document_with(
        CreateDocument::new("OWN-1", "Mine", "SOP", "Finance"),
        RelationshipSet {
            owners: Some(vec![owner.id.clone()]),
            ..Default::default()
        },
    )?;
    app.create_document("OWN-2", "Finance")?;

    let as_owner = commands::list_documents(
        &app.state,
        &app.actor(&owner),
        &finance_filter(),
        Pagination::default(),
        Sort::default(),
    )?;
    assert_eq!(as_owner.pagination.total, 1);
    assert_eq!(as_owner.documents[0].document_code, "OWN-1");

    let as_controller = commands::list_documents(
        &app.state,
        &app.actor(&controller),
        &finance_filter(),
        Pagination::default(),
        Sort::default(),
    )?;
    assert_eq!(as_controller.pagination.total, 2);
    Ok(())
}

#[test]
fn soft_deleted_documents_are_hidden_unless_asked_for() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin()?;
    app.create_document("KEEP-1", "Ops")?;
    let gone = app.create_document("GONE-1", "Ops")?;
    commands::soft_delete_document(&app.state, &admin, &gone.document.id)?;

    let list = |filters: DocumentFilters| -> Result<i64> {
        Ok(commands::list_documents(&app.state, &admin, &filters, Pagination::default(), Sort::default())?
            .pagination
            .total)
    };

    assert_eq!(list(DocumentFilters::default())?, 1);
    assert_eq!(
        list(DocumentFilters {
            include_deleted: true,
            ..Default::default()
        })?,
        2
    );
    assert_eq!(
        list(DocumentFilters {
            status: Some(DocumentStatus::Deleted),
            ..Default::default()
        })?,
        1
    );
    Ok(())
}

#[test]
fn default_sort_is_newest_first() -> Result<()> {
    let app = TestApp::new()?;
    for code in ["OLD", "MID", "NEW"] {
        app.create_document(code, "Ops")?;
        common::pause();
    }
    let page = app.state.query.list(
        &Scope::All,
        &DocumentFilters::default(),
        Pagination::default(),
        Sort::default(),
    )?;
    let codes: Vec<&str> = page.documents.iter().map(|d| d.document_code.as_str()).collect();
    assert_eq!(codes, vec!["NEW", "MID", "OLD"]);
    Ok(())
}
