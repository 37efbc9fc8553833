//! DDL builders for the statements a model issues against its table
//!
//! Fragments are raw caller-supplied SQL; these builders only arrange them.

/// Builder for `CREATE TABLE IF NOT EXISTS`
#[derive(Debug, Clone)]
pub struct TableBuilder {
    table_name: String,
    columns: Vec<String>,
}

impl TableBuilder {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns: Vec::new(),
        }
    }

    /// Add the implicit auto-increment primary key
    pub fn id(&mut self, name: &str) -> &mut Self {
        self.columns.push(format!("{} SERIAL NOT NULL PRIMARY KEY", name));
        self
    }

    /// Add a raw column definition such as `fullname TEXT NOT NULL`
    pub fn column(&mut self, definition: &str) -> &mut Self {
        self.columns.push(definition.trim().to_string());
        self
    }

    /// Add a nullable timestamp column
    pub fn timestamp(&mut self, name: &str) -> &mut Self {
        self.columns.push(format!("{} TIMESTAMP", name));
        self
    }

    /// Column definitions joined for the body of the statement
    pub fn definitions(&self) -> String {
        self.columns.join(", ")
    }

    /// Build the CREATE TABLE SQL
    pub fn to_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table_name,
            self.definitions()
        )
    }
}

/// Builder for a single multi-action `ALTER TABLE`
#[derive(Debug, Clone)]
pub struct AlterTableBuilder {
    table_name: String,
    actions: Vec<String>,
}

impl AlterTableBuilder {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            actions: Vec::new(),
        }
    }

    /// Add a column from its raw definition
    pub fn add_column(&mut self, definition: &str) -> &mut Self {
        self.actions
            .push(format!("ADD COLUMN IF NOT EXISTS {}", definition.trim()));
        self
    }

    /// Add a nullable timestamp column
    pub fn add_timestamp(&mut self, name: &str) -> &mut Self {
        self.actions
            .push(format!("ADD COLUMN IF NOT EXISTS {} TIMESTAMP", name));
        self
    }

    /// Add a named foreign key constraint
    pub fn add_foreign_key(
        &mut self,
        constraint_name: &str,
        column: &str,
        references_table: &str,
        references_column: &str,
    ) -> &mut Self {
        self.actions.push(format!(
            "ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
            constraint_name, column, references_table, references_column
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Build the ALTER TABLE SQL
    pub fn to_sql(&self) -> String {
        format!("ALTER TABLE {} {}", self.table_name, self.actions.join(", "))
    }
}
